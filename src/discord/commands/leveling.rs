// Discord commands for the leveling system.
//
// Extract ids, ask the leveling service, format the embed.

use crate::core::leveling::xp_threshold;
use crate::discord::leveling_announcements::{level_color, progress_bar};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

const LEADERBOARD_SIZE: usize = 10;

/// Show your current level and XP.
#[poise::command(slash_command, guild_only)]
pub async fn level(
    ctx: Context<'_>,
    #[description = "User to check (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let target_user = user.as_ref().unwrap_or_else(|| ctx.author());
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();

    let Some(record) = ctx
        .data()
        .leveling
        .get_record(target_user.id.get(), guild_id)
        .await?
    else {
        ctx.send(
            poise::CreateReply::default()
                .content(format!(
                    "**{}** doesn't have a level yet.",
                    target_user.display_name()
                ))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    let threshold = xp_threshold(record.level);
    let embed = serenity::CreateEmbed::new()
        .title(format!("Level - {}", target_user.display_name()))
        .color(level_color(record.level))
        .thumbnail(target_user.face())
        .field("Level", format!("**{}**", record.level), true)
        .field("XP", format!("`{}/{}`", record.xp, threshold), true)
        .field("Progress", progress_bar(record.xp, threshold), false);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show the top 10 members of this server.
#[poise::command(slash_command, guild_only)]
pub async fn leaderboard(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;

    let entries = ctx
        .data()
        .leveling
        .leaderboard(guild_id.get(), LEADERBOARD_SIZE)
        .await?;

    if entries.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("Nobody on this server has earned a level yet!")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let guild_name = ctx
        .guild()
        .map(|g| g.name.clone())
        .unwrap_or_else(|| "this server".to_string());

    let mut description = String::new();
    for (index, entry) in entries.iter().enumerate() {
        let rank = index + 1;
        let medal = match rank {
            1 => "🥇",
            2 => "🥈",
            3 => "🥉",
            _ => "",
        };
        description.push_str(&format!(
            "**{}.** {} <@{}> - Level **{}** (XP: {})\n",
            rank, medal, entry.user_id, entry.record.level, entry.record.xp
        ));
    }

    let embed = serenity::CreateEmbed::new()
        .title(format!("🏆 {} leaderboard", guild_name))
        .description(description)
        .color(serenity::Colour::GOLD);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

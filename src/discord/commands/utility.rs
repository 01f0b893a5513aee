// Small utility commands.

use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Show information about this server.
#[poise::command(slash_command, guild_only)]
pub async fn info(ctx: Context<'_>) -> Result<(), Error> {
    let embed = {
        let guild = ctx.guild().ok_or("This server is not cached yet")?;

        let mut embed = serenity::CreateEmbed::new()
            .title(format!("Information about {}", guild.name))
            .color(serenity::Colour::BLUE)
            .field("Owner", format!("<@{}>", guild.owner_id), true)
            .field("Members", guild.member_count.to_string(), true)
            .field(
                "Created",
                format!("<t:{}:D>", guild.id.created_at().unix_timestamp()),
                true,
            );
        if let Some(icon) = guild.icon_url() {
            embed = embed.thumbnail(icon);
        }
        embed
    };

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show someone's avatar.
#[poise::command(slash_command)]
pub async fn avatar(
    ctx: Context<'_>,
    #[description = "User (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let target = user.as_ref().unwrap_or_else(|| ctx.author());

    let embed = serenity::CreateEmbed::new()
        .title(format!("Avatar of {}", target.display_name()))
        .image(target.face())
        .color(serenity::Colour::BLURPLE);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Check the bot's gateway latency.
#[poise::command(slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let latency = ctx.ping().await;
    ctx.say(format!("🏓 Pong! Latency: **{}ms**", latency.as_millis()))
        .await?;
    Ok(())
}

/// Make the bot say something in this channel.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn say(
    ctx: Context<'_>,
    #[description = "What to say"] text: String,
) -> Result<(), Error> {
    ctx.channel_id().say(ctx, text).await?;
    ctx.send(
        poise::CreateReply::default()
            .content("Sent!")
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

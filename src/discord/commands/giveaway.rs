// Giveaway command.
//
// The giveaway lives only as long as this command invocation: the collector
// loop takes entries until the deadline, then the winner is drawn.

use crate::core::giveaway::{EntryOutcome, Giveaway, GiveawayError, GiveawayResult};
use crate::core::moderation::parse_duration;
use crate::discord::{Context, Error};
use chrono::Utc;
use poise::serenity_prelude as serenity;
use tracing::info;

/// Start a giveaway members can join with a button.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn giveaway(
    ctx: Context<'_>,
    #[description = "How long it runs, e.g. 1h30m"] duration: String,
    #[description = "What the winner gets"] prize: String,
    #[description = "Channel to post in (defaults to this one)"]
    #[channel_types("Text")]
    channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let Some(length) = parse_duration(&duration) else {
        ctx.send(
            poise::CreateReply::default()
                .content("Invalid duration format.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    let channel_id = channel.map(|c| c.id).unwrap_or_else(|| ctx.channel_id());
    let mut giveaway = Giveaway::new(prize, Utc::now(), length);
    let button_id = format!("giveaway_join_{}", ctx.id());

    let mut msg = channel_id
        .send_message(
            ctx,
            serenity::CreateMessage::new()
                .embed(open_embed(&giveaway))
                .components(join_button(&button_id, false)),
        )
        .await?;

    ctx.send(
        poise::CreateReply::default()
            .content(format!("Giveaway started in <#{}>!", channel_id))
            .ephemeral(true),
    )
    .await?;

    info!(
        channel_id = channel_id.get(),
        prize = %giveaway.prize,
        ends_at = %giveaway.ends_at,
        "Giveaway started"
    );

    let msg_id = msg.id;
    loop {
        let remaining = giveaway.time_remaining(Utc::now());
        if remaining.is_zero() {
            break;
        }

        let collector_id = button_id.clone();
        let Some(mci) = serenity::ComponentInteractionCollector::new(ctx)
            .channel_id(channel_id)
            .timeout(remaining)
            .filter(move |mci| mci.message.id == msg_id && mci.data.custom_id == collector_id)
            .await
        else {
            break;
        };

        let reply = match giveaway.enter(mci.user.id.get()) {
            Ok(EntryOutcome::Joined) => "You have joined the giveaway!",
            Ok(EntryOutcome::AlreadyEntered) => "You have already entered!",
            Err(GiveawayError::Closed) => "This giveaway has already ended.",
        };

        mci.create_response(
            &ctx,
            serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new()
                    .content(reply)
                    .ephemeral(true),
            ),
        )
        .await?;
    }

    let entrants = giveaway.entrant_count();
    let result = giveaway.close(&mut rand::thread_rng())?;

    let outcome_line = match result {
        GiveawayResult::Winner(user_id) => format!("Winner: <@{user_id}>"),
        GiveawayResult::NoEntrants => "Winner: none (nobody entered)".to_string(),
    };

    msg.edit(
        ctx,
        serenity::EditMessage::new()
            .embed(
                serenity::CreateEmbed::new()
                    .title("🎉 Giveaway 🎉")
                    .color(serenity::Colour::LIGHT_GREY)
                    .field("Prize", format!("**{}**", giveaway.prize), false)
                    .field("Entries", entrants.to_string(), true)
                    .description(format!("**Ended!**\n{outcome_line}")),
            )
            .components(join_button(&button_id, true)),
    )
    .await?;

    if let GiveawayResult::Winner(user_id) = result {
        channel_id
            .say(
                ctx,
                format!(
                    "🎉 Congratulations <@{}>! You won **{}**!",
                    user_id, giveaway.prize
                ),
            )
            .await?;
    }

    info!(channel_id = channel_id.get(), entrants, "Giveaway ended");
    Ok(())
}

fn open_embed(giveaway: &Giveaway) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title("🎉 New giveaway! 🎉")
        .color(serenity::Colour::MAGENTA)
        .field("Prize", format!("**{}**", giveaway.prize), false)
        .field(
            "Ends",
            format!("<t:{}:R>", giveaway.ends_at.timestamp()),
            false,
        )
}

fn join_button(custom_id: &str, disabled: bool) -> Vec<serenity::CreateActionRow> {
    vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(custom_id)
            .label("🎉 Join")
            .style(serenity::ButtonStyle::Success)
            .disabled(disabled),
    ])]
}

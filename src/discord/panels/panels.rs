// Verification and support-ticket panels.
//
// The buttons carry fixed custom ids so they keep working after a restart;
// presses arrive through the gateway event handler, not a collector.

use crate::core::settings::SettingKey;
use crate::discord::error_handler::is_forbidden;
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;
use std::time::Duration;
use tracing::{info, warn};

pub const VERIFY_BUTTON: &str = "verify_button";
pub const OPEN_TICKET_BUTTON: &str = "create_ticket_button";
pub const CLOSE_TICKET_BUTTON: &str = "close_ticket_button";

const TICKET_CLOSE_DELAY: Duration = Duration::from_secs(5);

pub fn verification_panel(text: &str) -> serenity::CreateMessage {
    let embed = serenity::CreateEmbed::new()
        .title("Verification")
        .description(text)
        .color(serenity::Colour::DARK_GREEN);

    serenity::CreateMessage::new()
        .embed(embed)
        .components(vec![serenity::CreateActionRow::Buttons(vec![
            serenity::CreateButton::new(VERIFY_BUTTON)
                .label("✅ Verify")
                .style(serenity::ButtonStyle::Success),
        ])])
}

pub fn ticket_panel() -> serenity::CreateMessage {
    let embed = serenity::CreateEmbed::new()
        .title("Need help?")
        .description("Click the button below to open a private ticket with the staff.")
        .color(serenity::Colour::BLUE);

    serenity::CreateMessage::new()
        .embed(embed)
        .components(vec![serenity::CreateActionRow::Buttons(vec![
            serenity::CreateButton::new(OPEN_TICKET_BUTTON)
                .label("✉️ Open ticket")
                .style(serenity::ButtonStyle::Primary),
        ])])
}

/// Route a panel button press. Returns `false` for buttons owned by someone else.
pub async fn handle_component(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    data: &Data,
) -> Result<bool, Error> {
    match interaction.data.custom_id.as_str() {
        VERIFY_BUTTON => verify(ctx, interaction, data).await?,
        OPEN_TICKET_BUTTON => open_ticket(ctx, interaction, data).await?,
        CLOSE_TICKET_BUTTON => close_ticket(ctx, interaction).await?,
        _ => return Ok(false),
    }
    Ok(true)
}

async fn verify(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    data: &Data,
) -> Result<(), Error> {
    let Some(guild_id) = interaction.guild_id else {
        return Ok(());
    };

    let Some(role_id) = data
        .settings
        .get(guild_id.get(), SettingKey::VerificationRole)
        .await?
    else {
        return reply_ephemeral(ctx, interaction, "Verification is not configured on this server.")
            .await;
    };
    let role_id = serenity::RoleId::new(role_id);

    let already_verified = interaction
        .member
        .as_ref()
        .is_some_and(|member| member.roles.contains(&role_id));
    if already_verified {
        return reply_ephemeral(ctx, interaction, "You are already verified.").await;
    }

    let user_id = interaction.user.id;
    match ctx
        .http
        .add_member_role(guild_id, user_id, role_id, Some("Verification panel"))
        .await
    {
        Ok(()) => {
            info!(guild_id = guild_id.get(), user_id = user_id.get(), "Member verified");
            reply_ephemeral(ctx, interaction, "You have been verified!").await
        }
        Err(e) if is_forbidden(&e) => {
            warn!(guild_id = guild_id.get(), "Missing permission to grant verification role");
            reply_ephemeral(
                ctx,
                interaction,
                "I can't give you that role. Please contact an administrator.",
            )
            .await
        }
        Err(e) => Err(e.into()),
    }
}

async fn open_ticket(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    data: &Data,
) -> Result<(), Error> {
    let Some(guild_id) = interaction.guild_id else {
        return Ok(());
    };
    interaction.defer_ephemeral(&ctx.http).await?;

    let category = data
        .settings
        .get(guild_id.get(), SettingKey::TicketCategory)
        .await?;
    let staff_role = data
        .settings
        .get(guild_id.get(), SettingKey::TicketStaffRole)
        .await?;
    let (Some(category), Some(staff_role)) = (category, staff_role) else {
        return follow_up(ctx, interaction, "The ticket system is not configured.").await;
    };
    let staff_role = serenity::RoleId::new(staff_role);
    let user = &interaction.user;

    let view = serenity::Permissions::VIEW_CHANNEL;
    let overwrites = vec![
        // @everyone shares the guild's id.
        serenity::PermissionOverwrite {
            allow: serenity::Permissions::empty(),
            deny: view,
            kind: serenity::PermissionOverwriteType::Role(serenity::RoleId::new(guild_id.get())),
        },
        serenity::PermissionOverwrite {
            allow: view,
            deny: serenity::Permissions::empty(),
            kind: serenity::PermissionOverwriteType::Member(user.id),
        },
        serenity::PermissionOverwrite {
            allow: view | serenity::Permissions::MANAGE_CHANNELS,
            deny: serenity::Permissions::empty(),
            kind: serenity::PermissionOverwriteType::Role(staff_role),
        },
    ];

    let channel = match guild_id
        .create_channel(
            &ctx.http,
            serenity::CreateChannel::new(format!("ticket-{}", user.name))
                .kind(serenity::ChannelType::Text)
                .category(serenity::ChannelId::new(category))
                .permissions(overwrites),
        )
        .await
    {
        Ok(channel) => channel,
        Err(e) if is_forbidden(&e) => {
            return follow_up(ctx, interaction, "I don't have permission to create channels.")
                .await;
        }
        Err(e) => return Err(e.into()),
    };

    let greeting = serenity::CreateEmbed::new()
        .title("Ticket opened!")
        .description(format!(
            "Hi <@{}>! Describe your problem and someone from <@&{}> will be with you shortly.",
            user.id, staff_role
        ))
        .color(0x2ecc71);

    channel
        .id
        .send_message(
            &ctx.http,
            serenity::CreateMessage::new()
                .content(format!("<@{}> <@&{}>", user.id, staff_role))
                .embed(greeting)
                .components(vec![serenity::CreateActionRow::Buttons(vec![
                    serenity::CreateButton::new(CLOSE_TICKET_BUTTON)
                        .label("🔒 Close ticket")
                        .style(serenity::ButtonStyle::Danger),
                ])]),
        )
        .await?;

    info!(
        guild_id = guild_id.get(),
        user_id = user.id.get(),
        channel_id = channel.id.get(),
        "Ticket opened"
    );
    follow_up(
        ctx,
        interaction,
        &format!("Your ticket has been opened: <#{}>", channel.id),
    )
    .await
}

async fn close_ticket(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
) -> Result<(), Error> {
    interaction
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new()
                    .content("This channel will be deleted in 5 seconds..."),
            ),
        )
        .await?;

    tokio::time::sleep(TICKET_CLOSE_DELAY).await;

    info!(
        channel_id = interaction.channel_id.get(),
        closed_by = interaction.user.id.get(),
        "Ticket closed"
    );
    interaction.channel_id.delete(&ctx.http).await?;
    Ok(())
}

async fn reply_ephemeral(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    content: &str,
) -> Result<(), Error> {
    interaction
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}

async fn follow_up(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    content: &str,
) -> Result<(), Error> {
    interaction
        .create_followup(
            &ctx.http,
            serenity::CreateInteractionResponseFollowup::new()
                .content(content)
                .ephemeral(true),
        )
        .await?;
    Ok(())
}

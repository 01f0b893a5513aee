// Per-guild configuration commands.
//
// Each subcommand stores one or two ids through the settings service.
// The verification and ticket subcommands also post their button panels.

use crate::core::settings::SettingKey;
use crate::discord::panels;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Configure the bot for this server.
#[poise::command(
    slash_command,
    subcommands(
        "welcome",
        "goodbye",
        "autorole",
        "verification",
        "tickets",
        "show",
        "reset"
    ),
    required_permissions = "ADMINISTRATOR",
    guild_only
)]
pub async fn config(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Set the channel that greets new members.
#[poise::command(slash_command, guild_only)]
pub async fn welcome(
    ctx: Context<'_>,
    #[description = "Channel for welcome messages"]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
) -> Result<(), Error> {
    store(ctx, SettingKey::WelcomeChannel, channel.id.get()).await?;
    ctx.send(
        poise::CreateReply::default()
            .content(format!("✅ Welcome channel set to <#{}>.", channel.id))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Set the channel that says goodbye to leaving members.
#[poise::command(slash_command, guild_only)]
pub async fn goodbye(
    ctx: Context<'_>,
    #[description = "Channel for goodbye messages"]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
) -> Result<(), Error> {
    store(ctx, SettingKey::GoodbyeChannel, channel.id.get()).await?;
    ctx.send(
        poise::CreateReply::default()
            .content(format!("✅ Goodbye channel set to <#{}>.", channel.id))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Set the role every new member receives.
#[poise::command(slash_command, guild_only)]
pub async fn autorole(
    ctx: Context<'_>,
    #[description = "Role granted on join"] role: serenity::Role,
) -> Result<(), Error> {
    store(ctx, SettingKey::AutoRole, role.id.get()).await?;
    ctx.send(
        poise::CreateReply::default()
            .content(format!("✅ New members will receive <@&{}>.", role.id))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Post a verification panel that grants a role on click.
#[poise::command(slash_command, guild_only)]
pub async fn verification(
    ctx: Context<'_>,
    #[description = "Channel for the panel"]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
    #[description = "Role granted after verifying"] role: serenity::Role,
    #[description = "Text shown on the panel"] text: String,
) -> Result<(), Error> {
    store(ctx, SettingKey::VerificationRole, role.id.get()).await?;

    channel
        .id
        .send_message(ctx.http(), panels::verification_panel(&text))
        .await?;

    ctx.send(
        poise::CreateReply::default()
            .content(format!("✅ Verification panel posted in <#{}>.", channel.id))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Set up support tickets and post the panel that opens them.
#[poise::command(slash_command, guild_only)]
pub async fn tickets(
    ctx: Context<'_>,
    #[description = "Category new tickets are created in"]
    #[channel_types("Category")]
    category: serenity::GuildChannel,
    #[description = "Role that handles tickets"] staff_role: serenity::Role,
    #[description = "Channel for the panel"]
    #[channel_types("Text")]
    panel_channel: serenity::GuildChannel,
) -> Result<(), Error> {
    if category.kind != serenity::ChannelType::Category {
        ctx.send(
            poise::CreateReply::default()
                .content("Tickets need a category, not a regular channel.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    store(ctx, SettingKey::TicketCategory, category.id.get()).await?;
    store(ctx, SettingKey::TicketStaffRole, staff_role.id.get()).await?;

    panel_channel
        .id
        .send_message(ctx.http(), panels::ticket_panel())
        .await?;

    ctx.send(
        poise::CreateReply::default()
            .content(format!(
                "✅ Ticket system configured, panel posted in <#{}>.",
                panel_channel.id
            ))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Show everything configured for this server.
#[poise::command(slash_command, guild_only)]
pub async fn show(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let overview = ctx.data().settings.overview(guild_id.get()).await?;

    let mut embed = serenity::CreateEmbed::new()
        .title("⚙️ Server configuration")
        .color(serenity::Colour::BLURPLE);

    for (key, value) in overview {
        let shown = match value {
            Some(id) if key.is_role() => format!("<@&{id}>"),
            Some(id) => format!("<#{id}>"),
            None => "Not set".to_string(),
        };
        embed = embed.field(key.label(), shown, true);
    }

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum SettingChoice {
    #[name = "Welcome channel"]
    WelcomeChannel,
    #[name = "Goodbye channel"]
    GoodbyeChannel,
    #[name = "Auto role"]
    AutoRole,
    #[name = "Verification role"]
    VerificationRole,
    #[name = "Ticket category"]
    TicketCategory,
    #[name = "Ticket staff role"]
    TicketStaffRole,
}

impl From<SettingChoice> for SettingKey {
    fn from(value: SettingChoice) -> Self {
        match value {
            SettingChoice::WelcomeChannel => SettingKey::WelcomeChannel,
            SettingChoice::GoodbyeChannel => SettingKey::GoodbyeChannel,
            SettingChoice::AutoRole => SettingKey::AutoRole,
            SettingChoice::VerificationRole => SettingKey::VerificationRole,
            SettingChoice::TicketCategory => SettingKey::TicketCategory,
            SettingChoice::TicketStaffRole => SettingKey::TicketStaffRole,
        }
    }
}

/// Forget one setting.
#[poise::command(slash_command, guild_only)]
pub async fn reset(
    ctx: Context<'_>,
    #[description = "Setting to clear"] setting: SettingChoice,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let key = SettingKey::from(setting);

    let content = if ctx.data().settings.clear(guild_id.get(), key).await? {
        format!("✅ {} cleared.", key.label())
    } else {
        format!("{} was not set.", key.label())
    };
    ctx.send(poise::CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

async fn store(ctx: Context<'_>, key: SettingKey, value: u64) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    ctx.data().settings.set(guild_id.get(), key, value).await?;
    Ok(())
}

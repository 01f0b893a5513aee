// Welcome, goodbye and auto-role handling for member join/leave events.

use crate::core::settings::SettingKey;
use crate::discord::error_handler::is_forbidden;
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;
use tracing::warn;

pub async fn on_member_join(
    ctx: &serenity::Context,
    member: &serenity::Member,
    data: &Data,
) -> Result<(), Error> {
    let guild_id = member.guild_id;

    if let Some(channel_id) = data
        .settings
        .get(guild_id.get(), SettingKey::WelcomeChannel)
        .await?
    {
        let guild_name = guild_id
            .name(&ctx.cache)
            .unwrap_or_else(|| "the server".to_string());
        let embed = serenity::CreateEmbed::new()
            .title(format!("Welcome to {guild_name}!"))
            .description(format!("We're glad to have you here, <@{}>!", member.user.id))
            .thumbnail(member.face())
            .color(serenity::Colour::DARK_GREEN);

        serenity::ChannelId::new(channel_id)
            .send_message(&ctx.http, serenity::CreateMessage::new().embed(embed))
            .await?;
    }

    if let Some(role_id) = data.settings.get(guild_id.get(), SettingKey::AutoRole).await? {
        let result = member
            .add_role(&ctx.http, serenity::RoleId::new(role_id))
            .await;
        match result {
            Ok(()) => {}
            Err(e) if is_forbidden(&e) => warn!(
                guild_id = guild_id.get(),
                role_id, "Missing permission to grant the auto role"
            ),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

pub async fn on_member_leave(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    user: &serenity::User,
    data: &Data,
) -> Result<(), Error> {
    let Some(channel_id) = data
        .settings
        .get(guild_id.get(), SettingKey::GoodbyeChannel)
        .await?
    else {
        return Ok(());
    };

    let embed = serenity::CreateEmbed::new()
        .title("A member left the server")
        .description(format!("Goodbye, **{}**.", user.display_name()))
        .thumbnail(user.face())
        .color(serenity::Colour::RED);

    serenity::ChannelId::new(channel_id)
        .send_message(&ctx.http, serenity::CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

// Moderation commands: member actions plus the warning ledger.

use crate::core::moderation::{
    is_valid_timeout, parse_duration, Warning, WarningError, DEFAULT_REASON,
};
use crate::discord::error_handler::{is_forbidden, is_not_found};
use crate::discord::{Context, Error};
use chrono::Utc;
use poise::serenity_prelude as serenity;
use tracing::info;

/// Bulk deletes only accept messages younger than two weeks.
const BULK_DELETE_MAX_AGE_DAYS: i64 = 14;

/// Discord rejects embed field values longer than this (in characters).
const FIELD_VALUE_LIMIT: usize = 1024;
/// Room kept free for the "…and N more" tail.
const TAIL_RESERVE: usize = 24;
const REASON_PREVIEW_CHARS: usize = 200;

/// Moderation tools.
#[poise::command(
    slash_command,
    rename = "mod",
    subcommands(
        "ban", "unban", "kick", "mute", "unmute", "clear", "warn", "delwarn", "history"
    ),
    guild_only
)]
pub async fn moderation(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Ban a member from the server.
#[poise::command(slash_command, guild_only, required_permissions = "BAN_MEMBERS")]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "Member to ban"] member: serenity::Member,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let reason = reason.unwrap_or_else(|| DEFAULT_REASON.to_string());

    let invoker = ctx
        .author_member()
        .await
        .ok_or("Could not load your member data")?
        .into_owned();
    if outranks_or_equals(ctx, &member, &invoker, true)? {
        reply_ephemeral(
            ctx,
            "You can't ban someone with a role equal to or higher than yours.",
        )
        .await?;
        return Ok(());
    }

    guild_id
        .ban_with_reason(ctx.http(), member.user.id, 0, &reason)
        .await?;

    info!(
        guild_id = guild_id.get(),
        target = member.user.id.get(),
        moderator = ctx.author().id.get(),
        "Member banned"
    );
    ctx.say(format!(
        "🔨 **{}** has been banned. Reason: {}",
        member.display_name(),
        reason
    ))
    .await?;
    Ok(())
}

/// Lift a ban by user id.
#[poise::command(slash_command, guild_only, required_permissions = "BAN_MEMBERS")]
pub async fn unban(
    ctx: Context<'_>,
    #[description = "ID of the banned user"] user_id: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;

    let Some(user_id) = user_id
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(serenity::UserId::new)
    else {
        reply_ephemeral(ctx, "Invalid ID or user not banned.").await?;
        return Ok(());
    };

    match guild_id.unban(ctx.http(), user_id).await {
        Ok(()) => {
            info!(guild_id = guild_id.get(), target = user_id.get(), "User unbanned");
            ctx.say(format!("✅ <@{}> has been unbanned.", user_id)).await?;
        }
        Err(e) if is_not_found(&e) => {
            reply_ephemeral(ctx, "Invalid ID or user not banned.").await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Kick a member from the server.
#[poise::command(slash_command, guild_only, required_permissions = "KICK_MEMBERS")]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "Member to kick"] member: serenity::Member,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let reason = reason.unwrap_or_else(|| DEFAULT_REASON.to_string());

    guild_id
        .kick_with_reason(ctx.http(), member.user.id, &reason)
        .await?;

    info!(
        guild_id = guild_id.get(),
        target = member.user.id.get(),
        moderator = ctx.author().id.get(),
        "Member kicked"
    );
    ctx.say(format!(
        "👢 **{}** has been kicked. Reason: {}",
        member.display_name(),
        reason
    ))
    .await?;
    Ok(())
}

/// Time a member out, e.g. `1d2h`, `30m`, `45s` (at most 28 days).
#[poise::command(slash_command, guild_only, required_permissions = "MODERATE_MEMBERS")]
pub async fn mute(
    ctx: Context<'_>,
    #[description = "Member to mute"] member: serenity::Member,
    #[description = "Duration like 1d2h3m4s"] duration: String,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let reason = reason.unwrap_or_else(|| DEFAULT_REASON.to_string());

    let bot_id = ctx.cache().current_user().id;
    let bot_member = guild_id.member(ctx, bot_id).await?;
    if outranks_or_equals(ctx, &member, &bot_member, false)? {
        reply_ephemeral(
            ctx,
            "I can't mute someone with a role equal to or higher than mine.",
        )
        .await?;
        return Ok(());
    }

    let Some(length) = parse_duration(&duration).filter(|d| is_valid_timeout(*d)) else {
        reply_ephemeral(ctx, "Invalid duration or longer than 28 days!").await?;
        return Ok(());
    };

    let until =
        serenity::Timestamp::from_unix_timestamp(Utc::now().timestamp() + length.as_secs() as i64)?;

    let result = guild_id
        .edit_member(
            ctx.http(),
            member.user.id,
            serenity::EditMember::new()
                .disable_communication_until_datetime(until)
                .audit_log_reason(&reason),
        )
        .await;

    match result {
        Ok(_) => {
            info!(
                guild_id = guild_id.get(),
                target = member.user.id.get(),
                seconds = length.as_secs(),
                "Member muted"
            );
            reply_ephemeral(
                ctx,
                &format!("🔇 **{}** has been muted for `{}`.", member.display_name(), duration),
            )
            .await?;
        }
        Err(e) if is_forbidden(&e) => {
            reply_ephemeral(ctx, "I don't have permission to mute members on this server.")
                .await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Remove a member's timeout.
#[poise::command(slash_command, guild_only, required_permissions = "MODERATE_MEMBERS")]
pub async fn unmute(
    ctx: Context<'_>,
    #[description = "Member to unmute"] member: serenity::Member,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;

    let now = Utc::now().timestamp();
    let muted = member
        .communication_disabled_until
        .is_some_and(|until| until.unix_timestamp() > now);
    if !muted {
        reply_ephemeral(ctx, "This member is not muted.").await?;
        return Ok(());
    }

    let result = guild_id
        .edit_member(
            ctx.http(),
            member.user.id,
            serenity::EditMember::new()
                .enable_communication()
                .audit_log_reason(&format!("Unmuted by {}", ctx.author().name)),
        )
        .await;

    match result {
        Ok(_) => {
            reply_ephemeral(
                ctx,
                &format!("🔊 **{}** has been unmuted.", member.display_name()),
            )
            .await?;
        }
        Err(e) if is_forbidden(&e) => {
            reply_ephemeral(ctx, "I don't have permission to remove timeouts.").await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Delete the most recent messages in this channel.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn clear(
    ctx: Context<'_>,
    #[description = "How many messages (1-100)"]
    #[min = 1]
    #[max = 100]
    amount: u8,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let channel_id = ctx.channel_id();
    let messages = channel_id
        .messages(ctx, serenity::GetMessages::new().limit(amount))
        .await?;

    let cutoff = Utc::now().timestamp() - BULK_DELETE_MAX_AGE_DAYS * 24 * 60 * 60;
    let (recent, old): (Vec<_>, Vec<_>) = messages
        .iter()
        .map(|m| m.id)
        .partition(|id| id.created_at().unix_timestamp() > cutoff);

    if !recent.is_empty() {
        channel_id.delete_messages(ctx, &recent).await?;
    }
    for id in &old {
        channel_id.delete_message(ctx, *id).await?;
    }

    let deleted = recent.len() + old.len();
    info!(channel_id = channel_id.get(), deleted, "Messages cleared");
    ctx.say(format!("✅ Deleted `{}` messages.", deleted)).await?;
    Ok(())
}

/// Give a member a warning.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn warn(
    ctx: Context<'_>,
    #[description = "Member to warn"] member: serenity::Member,
    #[description = "Reason"] reason: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;

    let count = ctx
        .data()
        .warnings
        .add_warning(
            member.user.id.get(),
            guild_id.get(),
            &reason,
            ctx.author().id.get(),
        )
        .await?;

    ctx.say(format!(
        "⚠️ **{}** has been warned (total: {}).",
        member.display_name(),
        count
    ))
    .await?;
    Ok(())
}

/// Remove one of a member's warnings by its number.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn delwarn(
    ctx: Context<'_>,
    #[description = "Member"] member: serenity::Member,
    #[description = "Warning number from /mod history"] number: i64,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;

    match ctx
        .data()
        .warnings
        .remove_warning(member.user.id.get(), guild_id.get(), number)
        .await
    {
        Ok(_) => reply_ephemeral(ctx, &format!("✅ Removed warning `{}`.", number)).await?,
        Err(WarningError::InvalidIndex { .. }) => {
            reply_ephemeral(ctx, "Invalid warning number.").await?
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Show a member's warnings.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn history(
    ctx: Context<'_>,
    #[description = "Member"] member: serenity::Member,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;

    let warnings = ctx
        .data()
        .warnings
        .list_warnings(member.user.id.get(), guild_id.get())
        .await?;

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("History - {}", member.display_name()))
        .color(member.colour(ctx.cache()).unwrap_or_default());

    if warnings.is_empty() {
        embed = embed.field("Warnings", "None.", false);
    } else {
        let text = warning_list(&warnings);
        embed = embed.field(format!("Warnings ({})", warnings.len()), text, false);
    }

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Whether `target`'s highest role is at or above `other`'s.
///
/// With `owner_exempt`, the server owner acting as `other` is never blocked.
fn outranks_or_equals(
    ctx: Context<'_>,
    target: &serenity::Member,
    other: &serenity::Member,
    owner_exempt: bool,
) -> Result<bool, Error> {
    let guild = ctx.guild().ok_or("This server is not cached yet")?;
    if owner_exempt && other.user.id == guild.owner_id {
        return Ok(false);
    }

    let position = |m: &serenity::Member| {
        guild
            .member_highest_role(m)
            .map(|role| role.position)
            .unwrap_or(0)
    };
    Ok(position(target) >= position(other))
}

async fn reply_ephemeral(ctx: Context<'_>, content: &str) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content(content)
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Numbered warning lines that fit in one embed field.
fn warning_list(warnings: &[Warning]) -> String {
    let mut text = String::new();
    let mut used = 0;

    for (i, warning) in warnings.iter().enumerate() {
        let mut reason: String = warning.reason.chars().take(REASON_PREVIEW_CHARS).collect();
        if reason.len() < warning.reason.len() {
            reason.push('…');
        }
        let line = format!(
            "**{}.** <t:{}:D> - `{}`\n",
            i + 1,
            warning.timestamp.timestamp(),
            reason
        );
        let line_chars = line.chars().count();

        let remaining = warnings.len() - i;
        let reserve = if remaining > 1 { TAIL_RESERVE } else { 0 };
        if used + line_chars + reserve > FIELD_VALUE_LIMIT {
            text.push_str(&format!("…and {remaining} more"));
            break;
        }
        text.push_str(&line);
        used += line_chars;
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_history_lists_every_warning() {
        let warnings = vec![Warning::new("spam", 1), Warning::new("caps", 2)];
        let text = warning_list(&warnings);
        assert!(text.contains("**1.**"));
        assert!(text.contains("`caps`"));
        assert!(!text.contains("more"));
    }

    #[test]
    fn long_history_fits_in_one_field() {
        let warnings: Vec<Warning> = (0..60)
            .map(|i| Warning::new(format!("reason number {i} with some extra words"), 1))
            .collect();

        let text = warning_list(&warnings);
        assert!(text.chars().count() <= FIELD_VALUE_LIMIT);
        assert!(text.ends_with(" more"));
        assert!(text.contains("**1.**"));
    }

    #[test]
    fn huge_reason_is_shortened() {
        let warnings = vec![Warning::new("x".repeat(5000), 1)];
        let text = warning_list(&warnings);
        assert!(text.chars().count() <= FIELD_VALUE_LIMIT);
        assert!(text.contains('…'));
    }
}

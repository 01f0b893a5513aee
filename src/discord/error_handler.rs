// Framework error hook.
//
// Every command error is logged with tracing. Command failures get a short
// ephemeral reply; everything else goes to poise's default handler.

use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;
use tracing::{error, warn};

pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(
                command = %ctx.command().qualified_name,
                guild_id = ctx.guild_id().map(|g| g.get()),
                user_id = ctx.author().id.get(),
                error = %error,
                "Command failed"
            );

            let message = match error.downcast_ref::<serenity::Error>() {
                Some(e) if is_forbidden(e) => {
                    "I don't have the permissions needed to do that.".to_string()
                }
                _ => format!("Something went wrong: {error}"),
            };

            if let Err(e) = ctx
                .send(poise::CreateReply::default().content(message).ephemeral(true))
                .await
            {
                warn!("Failed to report command error: {e}");
            }
        }
        other => {
            warn!("Framework error: {other}");
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Whether Discord rejected a request for missing permissions.
pub fn is_forbidden(error: &serenity::Error) -> bool {
    matches!(
        error,
        serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response))
            if response.status_code.as_u16() == 403
    )
}

/// Whether Discord answered with "not found" (unknown ban, deleted message).
pub fn is_not_found(error: &serenity::Error) -> bool {
    matches!(
        error,
        serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response))
            if response.status_code.as_u16() == 404
    )
}

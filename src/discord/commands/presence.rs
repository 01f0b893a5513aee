// Bot presence: a "playing on N servers" status refreshed on a fixed interval.

use poise::serenity_prelude as serenity;
use std::time::Duration;

const REFRESH_INTERVAL: Duration = Duration::from_secs(30);

pub fn server_count_activity(guilds: usize) -> serenity::ActivityData {
    serenity::ActivityData::playing(format!("on {guilds} servers"))
}

pub fn update_status(ctx: &serenity::Context) {
    let guilds = ctx.cache.guild_count();
    ctx.set_presence(
        Some(server_count_activity(guilds)),
        serenity::OnlineStatus::Online,
    );
}

/// Keep the status current for as long as the bot runs.
pub fn spawn_status_loop(ctx: serenity::Context) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(REFRESH_INTERVAL);
        loop {
            interval.tick().await;
            update_status(&ctx);
        }
    });
}

// Discord side of the music player: the now-playing message with its control
// buttons, and the handler for those buttons.

use crate::core::music::{MusicAnnouncer, MusicService, PauseState, Track};
use crate::discord::{Data, Error};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{debug, warn};

pub const PLAY_PAUSE_BUTTON: &str = "music_play_pause";
pub const STOP_BUTTON: &str = "music_stop";
pub const SKIP_BUTTON: &str = "music_skip";
pub const LOOP_BUTTON: &str = "music_loop";
pub const SHUFFLE_BUTTON: &str = "music_shuffle";

/// Posts player messages through the bot's HTTP client.
pub struct DiscordAnnouncer {
    http: Arc<serenity::Http>,
}

impl DiscordAnnouncer {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl MusicAnnouncer for DiscordAnnouncer {
    async fn now_playing(&self, channel_id: u64, track: &Track) -> Option<u64> {
        let message = serenity::CreateMessage::new()
            .embed(now_playing_embed(track))
            .components(control_buttons());

        match serenity::ChannelId::new(channel_id)
            .send_message(&self.http, message)
            .await
        {
            Ok(sent) => Some(sent.id.get()),
            Err(e) => {
                warn!(channel_id, error = %e, "Failed to post now-playing message");
                None
            }
        }
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) {
        if let Err(e) = self
            .http
            .delete_message(
                serenity::ChannelId::new(channel_id),
                serenity::MessageId::new(message_id),
                None,
            )
            .await
        {
            debug!(channel_id, message_id, error = %e, "Now-playing message already gone");
        }
    }

    async fn notice(&self, channel_id: u64, text: &str) {
        if let Err(e) = serenity::ChannelId::new(channel_id)
            .say(&self.http, text)
            .await
        {
            warn!(channel_id, error = %e, "Failed to post music notice");
        }
    }
}

pub fn now_playing_embed(track: &Track) -> serenity::CreateEmbed {
    let link = track.page_url.as_deref().unwrap_or(&track.source_url);
    let mut embed = serenity::CreateEmbed::new()
        .title("🎵 Now playing")
        .description(format!("**[{}]({})**", track.title, link))
        .color(serenity::Colour::DARK_GREEN);
    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }
    embed
}

pub fn control_buttons() -> Vec<serenity::CreateActionRow> {
    let button = |id: &str, label: &str, style| {
        serenity::CreateButton::new(id).label(label).style(style)
    };
    vec![serenity::CreateActionRow::Buttons(vec![
        button(PLAY_PAUSE_BUTTON, "⏯️", serenity::ButtonStyle::Primary),
        button(STOP_BUTTON, "⏹️", serenity::ButtonStyle::Danger),
        button(SKIP_BUTTON, "⏭️", serenity::ButtonStyle::Secondary),
        button(LOOP_BUTTON, "🔁", serenity::ButtonStyle::Secondary),
        button(SHUFFLE_BUTTON, "🔀", serenity::ButtonStyle::Secondary),
    ])]
}

/// The voice channel a member is sitting in, according to the cache.
pub fn member_voice_channel(
    cache: &serenity::Cache,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
) -> Option<u64> {
    let guild = cache.guild(guild_id)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|state| state.channel_id)
        .map(|channel| channel.get())
}

/// Route a player button press. Returns `false` for buttons owned by someone else.
pub async fn handle_component(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    data: &Data,
) -> Result<bool, Error> {
    let custom_id = interaction.data.custom_id.as_str();
    if !custom_id.starts_with("music_") {
        return Ok(false);
    }
    let Some(guild_id) = interaction.guild_id else {
        return Ok(true);
    };

    let presser_channel = member_voice_channel(&ctx.cache, guild_id, interaction.user.id);
    let reply = match presser_channel {
        None => "You must be in a voice channel to use these buttons!".to_string(),
        Some(channel) if data.music.connected_channel(guild_id.get()).await != Some(channel) => {
            "You must be in the same channel as the bot!".to_string()
        }
        Some(_) => press(&data.music, guild_id.get(), custom_id).await?,
    };

    interaction
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new()
                    .content(reply)
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(true)
}

async fn press(music: &MusicService, guild_id: u64, custom_id: &str) -> Result<String, Error> {
    let reply = match custom_id {
        PLAY_PAUSE_BUTTON => match music.toggle_pause(guild_id).await? {
            Some(PauseState::Paused) => "Paused.",
            Some(PauseState::Resumed) => "Resumed.",
            None => "Nothing is playing.",
        },
        STOP_BUTTON => {
            music.stop(guild_id).await?;
            "⏹️ Stopped the music."
        }
        SKIP_BUTTON => match music.skip(guild_id).await? {
            Some(_) => "Skipped.",
            None => "Nothing is playing.",
        },
        LOOP_BUTTON => {
            if music.toggle_loop(guild_id).await? {
                "🔁 Loop enabled."
            } else {
                "Loop disabled."
            }
        }
        SHUFFLE_BUTTON => {
            if music.shuffle(guild_id).await? {
                "🔀 Queue shuffled."
            } else {
                "Queue is empty."
            }
        }
        _ => "Unknown control.",
    };
    Ok(reply.to_string())
}

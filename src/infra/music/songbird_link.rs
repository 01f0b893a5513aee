use crate::core::music::{EndCallback, MusicError, PlaybackControl, PlaybackEnd, Track, VoiceLink};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use songbird::input::HttpRequest;
use songbird::tracks::{PlayMode, TrackHandle};
use songbird::{Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Voice connections and playback through songbird.
pub struct SongbirdVoiceLink {
    manager: Arc<Songbird>,
    http: reqwest::Client,
}

impl SongbirdVoiceLink {
    pub fn new(manager: Arc<Songbird>, http: reqwest::Client) -> Self {
        Self { manager, http }
    }
}

#[async_trait]
impl VoiceLink for SongbirdVoiceLink {
    async fn join(&self, guild_id: u64, channel_id: u64) -> Result<(), MusicError> {
        let guild = serenity::GuildId::new(guild_id);
        let channel = serenity::ChannelId::new(channel_id);

        let call = self
            .manager
            .join(guild, channel)
            .await
            .map_err(|e| MusicError::Playback(format!("could not join voice: {e}")))?;

        let mut call = call.lock().await;
        if let Err(e) = call.deafen(true).await {
            tracing::debug!(guild_id, error = %e, "Could not self-deafen");
        }
        Ok(())
    }

    async fn connected_channel(&self, guild_id: u64) -> Option<u64> {
        let call = self.manager.get(serenity::GuildId::new(guild_id))?;
        let call = call.lock().await;
        call.current_channel().map(|channel| channel.0.get())
    }

    async fn start(
        &self,
        guild_id: u64,
        track: &Track,
        volume: f32,
        on_end: EndCallback,
    ) -> Result<Box<dyn PlaybackControl>, MusicError> {
        let call = self
            .manager
            .get(serenity::GuildId::new(guild_id))
            .ok_or(MusicError::NotConnected)?;

        let input = HttpRequest::new(self.http.clone(), track.source_url.clone());
        let handle = {
            let mut call = call.lock().await;
            call.play_input(input.into())
        };

        handle
            .set_volume(volume)
            .map_err(|e| MusicError::Playback(e.to_string()))?;

        let notifier = TrackEndNotifier {
            fired: Arc::new(AtomicBool::new(false)),
            on_end,
        };
        for event in [TrackEvent::End, TrackEvent::Error] {
            handle
                .add_event(Event::Track(event), notifier.clone())
                .map_err(|e| MusicError::Playback(e.to_string()))?;
        }

        Ok(Box::new(SongbirdPlayback { handle }))
    }

    async fn disconnect(&self, guild_id: u64) {
        let guild = serenity::GuildId::new(guild_id);
        if self.manager.get(guild).is_none() {
            return;
        }
        if let Err(e) = self.manager.remove(guild).await {
            tracing::warn!(guild_id, error = %e, "Failed to leave voice channel");
        }
    }
}

struct SongbirdPlayback {
    handle: TrackHandle,
}

impl PlaybackControl for SongbirdPlayback {
    fn pause(&self) -> Result<(), MusicError> {
        self.handle
            .pause()
            .map_err(|e| MusicError::Playback(e.to_string()))
    }

    fn resume(&self) -> Result<(), MusicError> {
        self.handle
            .play()
            .map_err(|e| MusicError::Playback(e.to_string()))
    }

    fn stop(&self) -> Result<(), MusicError> {
        self.handle
            .stop()
            .map_err(|e| MusicError::Playback(e.to_string()))
    }

    fn set_volume(&self, volume: f32) -> Result<(), MusicError> {
        self.handle
            .set_volume(volume)
            .map_err(|e| MusicError::Playback(e.to_string()))
    }
}

/// Reports the end of one track back to the player, once.
#[derive(Clone)]
struct TrackEndNotifier {
    fired: Arc<AtomicBool>,
    on_end: EndCallback,
}

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(tracks) = ctx {
            if self.fired.swap(true, Ordering::SeqCst) {
                return None;
            }

            let end = match tracks.first().map(|(state, _)| &state.playing) {
                Some(PlayMode::Errored(e)) => PlaybackEnd::Failed(e.to_string()),
                _ => PlaybackEnd::Finished,
            };
            (self.on_end)(end);
        }
        None
    }
}

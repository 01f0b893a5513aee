// Ports the music core needs from the outside world.
// The infra layer implements them with yt-dlp, the Spotify Web API and songbird;
// tests implement them with in-memory mocks.

use super::music_models::{MusicError, PlaybackEnd, Track};
use async_trait::async_trait;
use std::sync::Arc;

/// Turns a free-text phrase into the first matching playable track.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn search(&self, phrase: &str) -> Result<Track, MusicError>;
}

/// Music catalog (Spotify) used only to turn links into search phrases.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn track_phrase(&self, url: &str) -> Result<String, MusicError>;
    async fn playlist_phrases(&self, url: &str) -> Result<Vec<String>, MusicError>;
}

/// Invoked exactly once when a started playback ends, from any thread.
pub type EndCallback = Arc<dyn Fn(PlaybackEnd) + Send + Sync>;

#[async_trait]
pub trait VoiceLink: Send + Sync {
    async fn join(&self, guild_id: u64, channel_id: u64) -> Result<(), MusicError>;

    /// Voice channel the bot is connected to in this guild, if any.
    async fn connected_channel(&self, guild_id: u64) -> Option<u64>;

    async fn is_connected(&self, guild_id: u64) -> bool {
        self.connected_channel(guild_id).await.is_some()
    }

    async fn start(
        &self,
        guild_id: u64,
        track: &Track,
        volume: f32,
        on_end: EndCallback,
    ) -> Result<Box<dyn PlaybackControl>, MusicError>;

    async fn disconnect(&self, guild_id: u64);
}

/// Handle to one running playback.
pub trait PlaybackControl: Send + Sync {
    fn pause(&self) -> Result<(), MusicError>;
    fn resume(&self) -> Result<(), MusicError>;
    /// Stopping still fires the end callback.
    fn stop(&self) -> Result<(), MusicError>;
    fn set_volume(&self, volume: f32) -> Result<(), MusicError>;
}

/// Where the player reports to: the text channel of the last `/music play`.
#[async_trait]
pub trait MusicAnnouncer: Send + Sync {
    /// Post the now-playing message, returning its id.
    async fn now_playing(&self, channel_id: u64, track: &Track) -> Option<u64>;
    async fn delete_message(&self, channel_id: u64, message_id: u64);
    async fn notice(&self, channel_id: u64, text: &str);
}

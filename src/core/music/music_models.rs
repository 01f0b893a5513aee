use thiserror::Error;

/// Volume a fresh session starts at (1.0 = 100%).
pub const DEFAULT_VOLUME: f32 = 0.5;

/// How many queued tracks `/music queue` shows.
pub const SNAPSHOT_LIMIT: usize = 15;

/// Consecutive start failures tolerated per advance before giving up.
pub const MAX_START_ATTEMPTS: usize = 3;

/// A playable item. Never mutated after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Direct stream URL handed to the voice stack.
    pub source_url: String,
    pub title: String,
    pub thumbnail: Option<String>,
    /// Human-facing page (video page), if the extractor reported one.
    pub page_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    CatalogTrack(String),
    CatalogPlaylist(String),
    Search(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueOutcome {
    pub added: usize,
    pub failed: usize,
    /// Title of the first queued track, for the confirmation message.
    pub first_title: Option<String>,
    /// Playback was idle and this request started it.
    pub started: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueSnapshot {
    pub current: Option<Track>,
    /// First `SNAPSHOT_LIMIT` queued tracks.
    pub upcoming: Vec<Track>,
    pub total_queued: usize,
    pub looping: bool,
    pub paused: bool,
    pub volume_percent: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseState {
    Paused,
    Resumed,
}

/// How a playback ended, as reported by the voice stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEnd {
    Finished,
    Failed(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MusicError {
    #[error("Nothing found for `{0}`")]
    NotFound(String),

    #[error("None of the requested tracks could be found")]
    NothingFound,

    #[error("Catalog lookup failed: {0}")]
    Catalog(String),

    #[error("Search failed: {0}")]
    Extractor(String),

    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("Not connected to a voice channel")]
    NotConnected,

    #[error("The music player for this server stopped responding")]
    PlayerGone,
}

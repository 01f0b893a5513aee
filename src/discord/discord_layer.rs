// Discord layer - commands, event handlers and the shared command data.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "error_handler.rs"]
pub mod error_handler;

#[path = "leveling/leveling_announcements.rs"]
pub mod leveling_announcements;

#[path = "members/member_events.rs"]
pub mod member_events;

#[path = "music/music_controls.rs"]
pub mod music_controls;

#[path = "panels/panels.rs"]
pub mod panels;

use crate::core::leveling::LevelingService;
use crate::core::moderation::WarningService;
use crate::core::music::MusicService;
use crate::core::settings::SettingsService;
use crate::infra::leveling::JsonLevelStore;
use crate::infra::moderation::JsonWarningStore;
use crate::infra::settings::JsonSettingsStore;
use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Everything a command or event handler can reach through poise.
pub struct Data {
    pub settings: Arc<SettingsService<JsonSettingsStore>>,
    pub warnings: Arc<WarningService<JsonWarningStore>>,
    pub leveling: Arc<LevelingService<JsonLevelStore>>,
    pub music: Arc<MusicService>,
    /// Shared HTTP client for outside APIs (memes).
    pub http_client: reqwest::Client,
}

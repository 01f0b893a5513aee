pub mod settings_models;
pub mod settings_service;
pub mod settings_store;

pub use settings_models::{GuildSettings, SettingKey};
pub use settings_service::SettingsService;
pub use settings_store::{SettingsError, SettingsStore};

use super::settings_models::GuildSettings;
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Per-guild key/value settings. Keys are free-form strings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, guild_id: u64, key: &str) -> Result<Option<u64>, SettingsError>;
    /// Stores the value and persists immediately.
    async fn set(&self, guild_id: u64, key: &str, value: u64) -> Result<(), SettingsError>;
    /// Returns whether a value was present.
    async fn remove(&self, guild_id: u64, key: &str) -> Result<bool, SettingsError>;
    async fn all(&self, guild_id: u64) -> Result<GuildSettings, SettingsError>;
}

use super::settings_models::{GuildSettings, SettingKey};
use super::settings_store::{SettingsError, SettingsStore};

pub struct SettingsService<S: SettingsStore> {
    store: S,
}

impl<S: SettingsStore> SettingsService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn get(&self, guild_id: u64, key: SettingKey) -> Result<Option<u64>, SettingsError> {
        self.store.get(guild_id, key.as_str()).await
    }

    pub async fn set(&self, guild_id: u64, key: SettingKey, value: u64) -> Result<(), SettingsError> {
        tracing::info!(guild_id, key = key.as_str(), value, "Guild setting updated");
        self.store.set(guild_id, key.as_str(), value).await
    }

    pub async fn clear(&self, guild_id: u64, key: SettingKey) -> Result<bool, SettingsError> {
        self.store.remove(guild_id, key.as_str()).await
    }

    /// Known settings for the guild, in display order, with `None` for unset ones.
    pub async fn overview(
        &self,
        guild_id: u64,
    ) -> Result<Vec<(SettingKey, Option<u64>)>, SettingsError> {
        let all: GuildSettings = self.store.all(guild_id).await?;
        Ok(SettingKey::ALL
            .iter()
            .map(|key| (*key, all.get(key.as_str()).copied()))
            .collect())
    }
}

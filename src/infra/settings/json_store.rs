use crate::core::settings::{GuildSettings, SettingsError, SettingsStore};
use crate::infra::json_file::{load_or_default, write_pretty};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// Guild settings persisted as `{ guild_id: { key: id } }`.
pub struct JsonSettingsStore {
    path: PathBuf,
    cache: RwLock<HashMap<u64, GuildSettings>>,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = load_or_default(&path);
        Self {
            path,
            cache: RwLock::new(cache),
        }
    }

    fn persist(&self, cache: &HashMap<u64, GuildSettings>) -> Result<(), SettingsError> {
        write_pretty(&self.path, cache)?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn get(&self, guild_id: u64, key: &str) -> Result<Option<u64>, SettingsError> {
        let cache = self.cache.read().await;
        Ok(cache.get(&guild_id).and_then(|g| g.get(key)).copied())
    }

    async fn set(&self, guild_id: u64, key: &str, value: u64) -> Result<(), SettingsError> {
        let mut cache = self.cache.write().await;
        let mut next = cache.clone();
        next.entry(guild_id)
            .or_default()
            .insert(key.to_string(), value);
        self.persist(&next)?;
        *cache = next;
        Ok(())
    }

    async fn remove(&self, guild_id: u64, key: &str) -> Result<bool, SettingsError> {
        let mut cache = self.cache.write().await;
        let mut next = cache.clone();
        let existed = next
            .get_mut(&guild_id)
            .map(|g| g.remove(key).is_some())
            .unwrap_or(false);
        if existed {
            self.persist(&next)?;
            *cache = next;
        }
        Ok(existed)
    }

    async fn all(&self, guild_id: u64) -> Result<GuildSettings, SettingsError> {
        let cache = self.cache.read().await;
        Ok(cache.get(&guild_id).cloned().unwrap_or_default())
    }
}

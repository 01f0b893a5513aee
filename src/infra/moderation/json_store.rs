use crate::core::moderation::{Warning, WarningError, WarningStore};
use crate::infra::json_file::{load_or_default, write_pretty};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// `{ guild_id: { user_id: [Warning, ...] } }`, oldest warning first.
type WarningMap = HashMap<u64, HashMap<u64, Vec<Warning>>>;

pub struct JsonWarningStore {
    path: PathBuf,
    cache: RwLock<WarningMap>,
}

impl JsonWarningStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = load_or_default(&path);
        Self {
            path,
            cache: RwLock::new(cache),
        }
    }

    fn persist(&self, cache: &WarningMap) -> Result<(), WarningError> {
        write_pretty(&self.path, cache).map_err(|e| WarningError::StorageError(e.to_string()))
    }
}

#[async_trait]
impl WarningStore for JsonWarningStore {
    async fn append(
        &self,
        user_id: u64,
        guild_id: u64,
        warning: Warning,
    ) -> Result<usize, WarningError> {
        let mut cache = self.cache.write().await;
        let mut next = cache.clone();
        let list = next
            .entry(guild_id)
            .or_default()
            .entry(user_id)
            .or_default();
        list.push(warning);
        let count = list.len();
        self.persist(&next)?;
        *cache = next;
        Ok(count)
    }

    async fn remove_at(
        &self,
        user_id: u64,
        guild_id: u64,
        position: usize,
    ) -> Result<Option<Warning>, WarningError> {
        let mut cache = self.cache.write().await;
        let mut next = cache.clone();
        let removed = next
            .get_mut(&guild_id)
            .and_then(|g| g.get_mut(&user_id))
            .filter(|list| position < list.len())
            .map(|list| list.remove(position));

        if removed.is_some() {
            self.persist(&next)?;
            *cache = next;
        }
        Ok(removed)
    }

    async fn list(&self, user_id: u64, guild_id: u64) -> Result<Vec<Warning>, WarningError> {
        let cache = self.cache.read().await;
        Ok(cache
            .get(&guild_id)
            .and_then(|g| g.get(&user_id))
            .cloned()
            .unwrap_or_default())
    }
}

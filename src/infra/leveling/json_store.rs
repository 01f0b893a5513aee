use crate::core::leveling::{LevelRecord, LevelStore, LevelingError};
use crate::infra::json_file::{load_or_default, write_pretty};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// JSON-based level store. All records live in a single file as a map:
/// { guild_id: { user_id: LevelRecord } }
type LevelMap = HashMap<u64, HashMap<u64, LevelRecord>>;

pub struct JsonLevelStore {
    path: PathBuf,
    cache: RwLock<LevelMap>,
}

impl JsonLevelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = load_or_default(&path);
        Self {
            path,
            cache: RwLock::new(cache),
        }
    }

    fn persist(&self, cache: &LevelMap) -> Result<(), LevelingError> {
        write_pretty(&self.path, cache).map_err(|e| LevelingError::StorageError(e.to_string()))
    }
}

#[async_trait]
impl LevelStore for JsonLevelStore {
    async fn get_record(
        &self,
        user_id: u64,
        guild_id: u64,
    ) -> Result<Option<LevelRecord>, LevelingError> {
        let cache = self.cache.read().await;
        Ok(cache.get(&guild_id).and_then(|g| g.get(&user_id)).copied())
    }

    async fn save_record(
        &self,
        user_id: u64,
        guild_id: u64,
        record: LevelRecord,
    ) -> Result<(), LevelingError> {
        let mut cache = self.cache.write().await;
        let mut next = cache.clone();
        next.entry(guild_id).or_default().insert(user_id, record);
        self.persist(&next)?;
        *cache = next;
        Ok(())
    }

    async fn guild_records(
        &self,
        guild_id: u64,
    ) -> Result<Vec<(u64, LevelRecord)>, LevelingError> {
        let cache = self.cache.read().await;
        Ok(cache
            .get(&guild_id)
            .map(|g| g.iter().map(|(user, record)| (*user, *record)).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_json_persistence_roundtrip() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_owned();
        drop(tmp);

        let store = JsonLevelStore::new(path.clone());
        let record = LevelRecord { xp: 123, level: 2 };
        store.save_record(5, 7, record).await.unwrap();

        // Reload from file
        let store2 = JsonLevelStore::new(path);
        assert_eq!(store2.get_record(5, 7).await.unwrap(), Some(record));
        assert_eq!(store2.get_record(5, 8).await.unwrap(), None);
        assert_eq!(store2.guild_records(7).await.unwrap(), vec![(5, record)]);
    }

    #[tokio::test]
    async fn failed_write_leaves_cache_untouched() {
        // A directory can't be opened for writing, so every persist fails.
        let dir = tempfile::tempdir().unwrap();
        let store = JsonLevelStore::new(dir.path());

        let record = LevelRecord { xp: 10, level: 1 };
        assert!(store.save_record(5, 7, record).await.is_err());
        assert_eq!(store.get_record(5, 7).await.unwrap(), None);
    }
}

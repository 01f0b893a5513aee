// Warning ledger - core business logic for moderator warnings.
//
// Warnings are append-only per (guild, user); the only removal is an explicit
// one by 1-based position, the way moderators see them in `/mod history`.
//
// NO Discord dependencies here - just pure domain logic.

use super::moderation_models::Warning;
use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum WarningError {
    #[error("Invalid warning number {index} (user has {count} warnings)")]
    InvalidIndex { index: i64, count: usize },

    #[error("Storage error: {0}")]
    StorageError(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting warnings.
#[async_trait]
pub trait WarningStore: Send + Sync {
    /// Append a warning. Returns the user's new warning count.
    async fn append(
        &self,
        user_id: u64,
        guild_id: u64,
        warning: Warning,
    ) -> Result<usize, WarningError>;

    /// Remove the warning at a zero-based position.
    /// Returns `None` (and changes nothing) when the position is out of range.
    async fn remove_at(
        &self,
        user_id: u64,
        guild_id: u64,
        position: usize,
    ) -> Result<Option<Warning>, WarningError>;

    /// All warnings for a user, oldest first.
    async fn list(&self, user_id: u64, guild_id: u64) -> Result<Vec<Warning>, WarningError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct WarningService<S: WarningStore> {
    store: S,
}

impl<S: WarningStore> WarningService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Record a warning and return how many the user now has.
    pub async fn add_warning(
        &self,
        user_id: u64,
        guild_id: u64,
        reason: &str,
        issuer_id: u64,
    ) -> Result<usize, WarningError> {
        let count = self
            .store
            .append(user_id, guild_id, Warning::new(reason, issuer_id))
            .await?;

        tracing::info!(user_id, guild_id, issuer_id, count, "Warning issued");
        Ok(count)
    }

    /// Remove a warning by its 1-based number.
    pub async fn remove_warning(
        &self,
        user_id: u64,
        guild_id: u64,
        number: i64,
    ) -> Result<Warning, WarningError> {
        let count = self.store.list(user_id, guild_id).await?.len();
        let invalid = || WarningError::InvalidIndex {
            index: number,
            count,
        };

        if number < 1 || number as u64 > count as u64 {
            return Err(invalid());
        }

        self.store
            .remove_at(user_id, guild_id, (number - 1) as usize)
            .await?
            .ok_or_else(invalid)
    }

    /// Warnings for a user, newest last.
    pub async fn list_warnings(
        &self,
        user_id: u64,
        guild_id: u64,
    ) -> Result<Vec<Warning>, WarningError> {
        self.store.list(user_id, guild_id).await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;

    struct MockWarningStore {
        warnings: DashMap<(u64, u64), Vec<Warning>>,
    }

    impl MockWarningStore {
        fn new() -> Self {
            Self {
                warnings: DashMap::new(),
            }
        }
    }

    #[async_trait]
    impl WarningStore for MockWarningStore {
        async fn append(
            &self,
            user_id: u64,
            guild_id: u64,
            warning: Warning,
        ) -> Result<usize, WarningError> {
            let mut entry = self.warnings.entry((guild_id, user_id)).or_default();
            entry.push(warning);
            Ok(entry.len())
        }

        async fn remove_at(
            &self,
            user_id: u64,
            guild_id: u64,
            position: usize,
        ) -> Result<Option<Warning>, WarningError> {
            Ok(self
                .warnings
                .get_mut(&(guild_id, user_id))
                .filter(|list| position < list.len())
                .map(|mut list| list.remove(position)))
        }

        async fn list(&self, user_id: u64, guild_id: u64) -> Result<Vec<Warning>, WarningError> {
            Ok(self
                .warnings
                .get(&(guild_id, user_id))
                .map(|list| list.clone())
                .unwrap_or_default())
        }
    }

    async fn service_with_warnings(reasons: &[&str]) -> WarningService<MockWarningStore> {
        let service = WarningService::new(MockWarningStore::new());
        for reason in reasons {
            service.add_warning(1, 10, reason, 99).await.unwrap();
        }
        service
    }

    #[tokio::test]
    async fn add_warning_returns_running_count() {
        let service = WarningService::new(MockWarningStore::new());

        assert_eq!(service.add_warning(1, 10, "spam", 99).await.unwrap(), 1);
        assert_eq!(service.add_warning(1, 10, "caps", 99).await.unwrap(), 2);
        // Other users and guilds are counted separately
        assert_eq!(service.add_warning(2, 10, "spam", 99).await.unwrap(), 1);
        assert_eq!(service.add_warning(1, 11, "spam", 99).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_keeps_issue_order() {
        let service = service_with_warnings(&["first", "second", "third"]).await;

        let reasons: Vec<String> = service
            .list_warnings(1, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|w| w.reason)
            .collect();

        assert_eq!(reasons, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn removing_middle_warning_drops_exactly_that_entry() {
        let service = service_with_warnings(&["a", "b", "c", "d"]).await;

        let removed = service.remove_warning(1, 10, 2).await.unwrap();
        assert_eq!(removed.reason, "b");

        let reasons: Vec<String> = service
            .list_warnings(1, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|w| w.reason)
            .collect();
        assert_eq!(reasons, vec!["a", "c", "d"]);
    }

    #[tokio::test]
    async fn removing_first_and_last_works() {
        let service = service_with_warnings(&["a", "b", "c"]).await;

        assert_eq!(service.remove_warning(1, 10, 3).await.unwrap().reason, "c");
        assert_eq!(service.remove_warning(1, 10, 1).await.unwrap().reason, "a");
        assert_eq!(service.list_warnings(1, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn out_of_range_removal_leaves_list_unchanged() {
        let service = service_with_warnings(&["a", "b"]).await;

        for bad in [0, -1, 3, 100] {
            let err = service.remove_warning(1, 10, bad).await.unwrap_err();
            assert!(matches!(err, WarningError::InvalidIndex { count: 2, .. }));
        }

        assert_eq!(service.list_warnings(1, 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn removal_for_user_without_warnings_is_invalid() {
        let service = WarningService::new(MockWarningStore::new());

        let err = service.remove_warning(5, 10, 1).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid warning number 1 (user has 0 warnings)"
        );
    }
}

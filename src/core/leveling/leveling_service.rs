// This is the leveling module - it contains ALL the business logic for the leveling system.
// It has NO Discord-specific code (no serenity, no poise imports) and works with
// primitive ids, so the Discord layer only has to announce what it returns.

use async_trait::async_trait;
use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// A user's progress in one guild.
///
/// Users can be in multiple guilds and progress separately in each one,
/// so records are always keyed by (guild, user).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRecord {
    pub xp: u64,
    pub level: u32,
}

impl Default for LevelRecord {
    fn default() -> Self {
        Self { xp: 0, level: 1 }
    }
}

/// Returned by the service when a user levels up so the Discord layer can announce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelUpEvent {
    pub user_id: u64,
    pub guild_id: u64,
    pub old_level: u32,
    pub new_level: u32,
    pub total_xp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub user_id: u64,
    pub record: LevelRecord,
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum LevelingError {
    #[error("User is on cooldown. Time remaining: {0:?}")]
    OnCooldown(Duration),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid user or guild ID")]
    InvalidId,
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================
// The core defines WHAT it needs, the infra layer provides HOW (JSON file, memory, ...).

#[async_trait]
pub trait LevelStore: Send + Sync {
    /// `None` if the user has never earned XP in this guild.
    async fn get_record(
        &self,
        user_id: u64,
        guild_id: u64,
    ) -> Result<Option<LevelRecord>, LevelingError>;

    /// Overwrite the user's record and persist it.
    async fn save_record(
        &self,
        user_id: u64,
        guild_id: u64,
        record: LevelRecord,
    ) -> Result<(), LevelingError>;

    /// Every record in the guild, in no particular order.
    async fn guild_records(&self, guild_id: u64)
        -> Result<Vec<(u64, LevelRecord)>, LevelingError>;
}

// ============================================================================
// PURE HELPERS
// ============================================================================

/// XP needed to leave `level`: 5·level² + 50·level + 100.
pub fn xp_threshold(level: u32) -> u64 {
    let level = level as u64;
    5 * level * level + 50 * level + 100
}

/// How many of `cells` progress cells are filled for `xp` out of `threshold`.
/// Clamped, since single-step leveling can leave xp above the threshold.
pub fn filled_cells(xp: u64, threshold: u64, cells: usize) -> usize {
    if threshold == 0 {
        return cells;
    }
    let filled = (xp as u128 * cells as u128 / threshold as u128) as usize;
    filled.min(cells)
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// The main service for leveling operations.
///
/// Generic over `S: LevelStore` so tests can swap in a mock store.
pub struct LevelingService<S: LevelStore> {
    store: S,

    /// XP rolled per rewarded message.
    xp_per_message: RangeInclusive<u64>,

    /// Cooldown between XP gains (prevents spam).
    cooldown: Duration,

    /// Last reward per (guild, user). Kept in memory only; a restart resets it.
    last_award: DashMap<(u64, u64), Instant>,

    /// Serializes read-modify-write of records.
    update_lock: Mutex<()>,
}

impl<S: LevelStore> LevelingService<S> {
    pub fn new(store: S) -> Self {
        Self::with_cooldown(store, Duration::from_secs(60))
    }

    pub fn with_cooldown(store: S, cooldown: Duration) -> Self {
        Self {
            store,
            xp_per_message: 15..=25,
            cooldown,
            last_award: DashMap::new(),
            update_lock: Mutex::new(()),
        }
    }

    fn validate_ids(user_id: u64, guild_id: u64) -> Result<(), LevelingError> {
        if user_id == 0 || guild_id == 0 {
            Err(LevelingError::InvalidId)
        } else {
            Ok(())
        }
    }

    /// Process a message and potentially award XP.
    ///
    /// **Returns:**
    /// - `Ok(Some(LevelUpEvent))` if the user leveled up
    /// - `Ok(None)` if XP was awarded but no level up occurred
    /// - `Err(LevelingError::OnCooldown)` if the user is on cooldown
    pub async fn process_message(
        &self,
        user_id: u64,
        guild_id: u64,
    ) -> Result<Option<LevelUpEvent>, LevelingError> {
        Self::validate_ids(user_id, guild_id)?;

        let now = Instant::now();
        match self.last_award.entry((guild_id, user_id)) {
            dashmap::mapref::entry::Entry::Occupied(mut last) => {
                let elapsed = now.duration_since(*last.get());
                if elapsed < self.cooldown {
                    return Err(LevelingError::OnCooldown(self.cooldown - elapsed));
                }
                last.insert(now);
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(now);
            }
        }

        let amount = rand::thread_rng().gen_range(self.xp_per_message.clone());
        self.apply_xp(user_id, guild_id, amount).await
    }

    /// Add XP and advance at most one level.
    ///
    /// A single large award can leave xp above the next threshold; the user
    /// then catches up one level per subsequent award.
    pub async fn apply_xp(
        &self,
        user_id: u64,
        guild_id: u64,
        amount: u64,
    ) -> Result<Option<LevelUpEvent>, LevelingError> {
        Self::validate_ids(user_id, guild_id)?;

        let _guard = self.update_lock.lock().await;

        let mut record = self
            .store
            .get_record(user_id, guild_id)
            .await?
            .unwrap_or_default();
        let old_level = record.level;

        record.xp = record.xp.saturating_add(amount);
        if record.xp >= xp_threshold(record.level) {
            record.level += 1;
        }

        self.store.save_record(user_id, guild_id, record).await?;

        if record.level > old_level {
            tracing::debug!(user_id, guild_id, level = record.level, "User leveled up");
            Ok(Some(LevelUpEvent {
                user_id,
                guild_id,
                old_level,
                new_level: record.level,
                total_xp: record.xp,
            }))
        } else {
            Ok(None)
        }
    }

    pub async fn get_record(
        &self,
        user_id: u64,
        guild_id: u64,
    ) -> Result<Option<LevelRecord>, LevelingError> {
        Self::validate_ids(user_id, guild_id)?;
        self.store.get_record(user_id, guild_id).await
    }

    /// Top `limit` users of a guild, highest (level, xp) first.
    pub async fn leaderboard(
        &self,
        guild_id: u64,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, LevelingError> {
        if guild_id == 0 {
            return Err(LevelingError::InvalidId);
        }

        let mut entries: Vec<LeaderboardEntry> = self
            .store
            .guild_records(guild_id)
            .await?
            .into_iter()
            .map(|(user_id, record)| LeaderboardEntry { user_id, record })
            .collect();

        entries.sort_by(|a, b| {
            (b.record.level, b.record.xp)
                .cmp(&(a.record.level, a.record.xp))
                .then(a.user_id.cmp(&b.user_id))
        });
        entries.truncate(limit);
        Ok(entries)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct MockLevelStore {
        records: StdMutex<HashMap<(u64, u64), LevelRecord>>,
    }

    #[async_trait]
    impl LevelStore for MockLevelStore {
        async fn get_record(
            &self,
            user_id: u64,
            guild_id: u64,
        ) -> Result<Option<LevelRecord>, LevelingError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .get(&(guild_id, user_id))
                .copied())
        }

        async fn save_record(
            &self,
            user_id: u64,
            guild_id: u64,
            record: LevelRecord,
        ) -> Result<(), LevelingError> {
            self.records
                .lock()
                .unwrap()
                .insert((guild_id, user_id), record);
            Ok(())
        }

        async fn guild_records(
            &self,
            guild_id: u64,
        ) -> Result<Vec<(u64, LevelRecord)>, LevelingError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|((g, _), _)| *g == guild_id)
                .map(|((_, u), r)| (*u, *r))
                .collect())
        }
    }

    fn make_service() -> LevelingService<MockLevelStore> {
        LevelingService::new(MockLevelStore::default())
    }

    #[test]
    fn test_xp_threshold() {
        assert_eq!(xp_threshold(1), 155);
        assert_eq!(xp_threshold(2), 220);
        assert_eq!(xp_threshold(10), 1_100);
    }

    #[test]
    fn filled_cells_is_clamped() {
        assert_eq!(filled_cells(0, 155, 20), 0);
        assert_eq!(filled_cells(77, 155, 20), 9);
        assert_eq!(filled_cells(155, 155, 20), 20);
        assert_eq!(filled_cells(400, 155, 20), 20);
    }

    #[tokio::test]
    async fn small_award_keeps_level() {
        let service = make_service();

        let event = service.apply_xp(1, 10, 20).await.unwrap();

        assert!(event.is_none());
        assert_eq!(
            service.get_record(1, 10).await.unwrap(),
            Some(LevelRecord { xp: 20, level: 1 })
        );
    }

    #[tokio::test]
    async fn crossing_threshold_levels_up_once() {
        let service = make_service();
        service.apply_xp(1, 10, 150).await.unwrap();

        let event = service.apply_xp(1, 10, 10).await.unwrap().unwrap();

        assert_eq!(event.old_level, 1);
        assert_eq!(event.new_level, 2);
        assert_eq!(event.total_xp, 160);
    }

    #[tokio::test]
    async fn huge_award_advances_single_level() {
        let service = make_service();

        let event = service.apply_xp(1, 10, 10_000).await.unwrap().unwrap();
        assert_eq!(event.new_level, 2);

        // The backlog is worked off one level per award
        let next = service.apply_xp(1, 10, 1).await.unwrap().unwrap();
        assert_eq!(next.new_level, 3);
    }

    #[tokio::test]
    async fn xp_and_level_never_decrease() {
        let service = make_service();
        let mut previous = LevelRecord::default();

        for amount in [15, 25, 0, 200, 18, 300, 21] {
            service.apply_xp(1, 10, amount).await.unwrap();
            let record = service.get_record(1, 10).await.unwrap().unwrap();
            assert!(record.xp >= previous.xp);
            assert!(record.level >= previous.level);
            previous = record;
        }
    }

    #[tokio::test]
    async fn message_within_cooldown_is_rejected() {
        let service = make_service();

        service.process_message(1, 10).await.unwrap();
        let err = service.process_message(1, 10).await.unwrap_err();
        assert!(matches!(err, LevelingError::OnCooldown(_)));

        let xp = service.get_record(1, 10).await.unwrap().unwrap().xp;
        assert!((15..=25).contains(&xp));
    }

    #[tokio::test]
    async fn cooldown_is_per_guild_and_user() {
        let service = make_service();

        service.process_message(1, 10).await.unwrap();
        assert!(service.process_message(2, 10).await.is_ok());
        assert!(service.process_message(1, 11).await.is_ok());
    }

    #[tokio::test]
    async fn expired_cooldown_awards_again() {
        let service = LevelingService::with_cooldown(MockLevelStore::default(), Duration::ZERO);

        service.process_message(1, 10).await.unwrap();
        service.process_message(1, 10).await.unwrap();

        let xp = service.get_record(1, 10).await.unwrap().unwrap().xp;
        assert!((30..=50).contains(&xp));
    }

    #[tokio::test]
    async fn leaderboard_orders_by_level_then_xp() {
        let service = make_service();
        let store = &service.store;
        store.save_record(1, 10, LevelRecord { xp: 500, level: 2 }).await.unwrap();
        store.save_record(2, 10, LevelRecord { xp: 100, level: 3 }).await.unwrap();
        store.save_record(3, 10, LevelRecord { xp: 900, level: 2 }).await.unwrap();
        store.save_record(4, 11, LevelRecord { xp: 9_999, level: 9 }).await.unwrap();

        let board = service.leaderboard(10, 10).await.unwrap();
        let order: Vec<u64> = board.iter().map(|e| e.user_id).collect();
        assert_eq!(order, vec![2, 3, 1]);

        assert_eq!(service.leaderboard(10, 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn zero_ids_are_rejected() {
        let service = make_service();

        assert!(matches!(
            service.apply_xp(0, 10, 5).await,
            Err(LevelingError::InvalidId)
        ));
        assert!(matches!(
            service.leaderboard(0, 10).await,
            Err(LevelingError::InvalidId)
        ));
    }

    #[test]
    fn leveling_error_messages_are_descriptive() {
        let storage_error = LevelingError::StorageError("disk full".into());
        assert!(storage_error.to_string().contains("disk full"));

        assert_eq!(LevelingError::InvalidId.to_string(), "Invalid user or guild ID");
    }
}

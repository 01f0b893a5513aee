// Giveaway state machine - entries, deadline and winner draw.
//
// Pure and in-memory: the Discord layer owns the timer and the message,
// this module only decides who is in and who wins.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GiveawayError {
    #[error("This giveaway has already ended")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveawayState {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    Joined,
    AlreadyEntered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveawayResult {
    Winner(u64),
    NoEntrants,
}

#[derive(Debug, Clone)]
pub struct Giveaway {
    pub prize: String,
    pub ends_at: DateTime<Utc>,
    entrants: HashSet<u64>,
    state: GiveawayState,
}

impl Giveaway {
    pub fn new(prize: impl Into<String>, now: DateTime<Utc>, duration: Duration) -> Self {
        let duration = chrono::Duration::from_std(duration)
            .unwrap_or_else(|_| chrono::Duration::days(365));
        Self {
            prize: prize.into(),
            ends_at: now.checked_add_signed(duration).unwrap_or(DateTime::<Utc>::MAX_UTC),
            entrants: HashSet::new(),
            state: GiveawayState::Open,
        }
    }

    /// Zero once the deadline has passed.
    pub fn time_remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.ends_at - now).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn state(&self) -> GiveawayState {
        self.state
    }

    pub fn entrant_count(&self) -> usize {
        self.entrants.len()
    }

    pub fn enter(&mut self, user_id: u64) -> Result<EntryOutcome, GiveawayError> {
        if self.state == GiveawayState::Closed {
            return Err(GiveawayError::Closed);
        }

        if self.entrants.insert(user_id) {
            Ok(EntryOutcome::Joined)
        } else {
            Ok(EntryOutcome::AlreadyEntered)
        }
    }

    /// Close the giveaway and draw a winner uniformly among entrants.
    pub fn close<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<GiveawayResult, GiveawayError> {
        if self.state == GiveawayState::Closed {
            return Err(GiveawayError::Closed);
        }
        self.state = GiveawayState::Closed;

        // HashSet order is random per process; sort so a seeded rng is reproducible.
        let mut pool: Vec<u64> = self.entrants.iter().copied().collect();
        pool.sort_unstable();

        Ok(pool
            .choose(rng)
            .map(|winner| GiveawayResult::Winner(*winner))
            .unwrap_or(GiveawayResult::NoEntrants))
    }
}

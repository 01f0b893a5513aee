// Moderation domain models - warnings and timeout durations.
//
// These are pure domain types with no Discord dependencies.
// The Discord layer turns them into bans, kicks and timeouts.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Longest timeout Discord accepts, in whole days.
pub const MAX_TIMEOUT_DAYS: u64 = 28;

/// Reason recorded when a moderator doesn't give one.
pub const DEFAULT_REASON: &str = "No reason given";

/// One warning issued to a user in a guild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub reason: String,
    /// Moderator who issued it.
    #[serde(alias = "moderator_id")]
    pub issuer_id: u64,
    #[serde(deserialize_with = "utc_or_naive")]
    pub timestamp: DateTime<Utc>,
}

/// RFC 3339, or a naive ISO timestamp taken as UTC (older warnings files).
fn utc_or_naive<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

impl Warning {
    pub fn new(reason: impl Into<String>, issuer_id: u64) -> Self {
        Self {
            reason: reason.into(),
            issuer_id,
            timestamp: Utc::now(),
        }
    }
}

/// Parse durations like `1d2h`, `30m` or `10m30s`.
///
/// Every `<digits><unit>` token is summed, units are `d`, `h`, `m`, `s`
/// (case-insensitive). Anything between tokens is ignored. Returns `None` when
/// the input holds no token at all.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let mut total_secs: u64 = 0;
    let mut digits = String::new();
    let mut matched = false;

    for ch in input.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }

        let unit_secs = match ch {
            'd' => Some(86_400),
            'h' => Some(3_600),
            'm' => Some(60),
            's' => Some(1),
            _ => None,
        };

        if let (Some(unit_secs), false) = (unit_secs, digits.is_empty()) {
            let value: u64 = digits.parse().unwrap_or(u64::MAX);
            total_secs = total_secs.saturating_add(value.saturating_mul(unit_secs));
            matched = true;
        }
        digits.clear();
    }

    matched.then(|| Duration::from_secs(total_secs))
}

/// Whether a parsed duration fits Discord's timeout limit.
///
/// Only whole days are compared, so `28d23h` is still accepted.
pub fn is_valid_timeout(duration: Duration) -> bool {
    duration.as_secs() / 86_400 <= MAX_TIMEOUT_DAYS
}

//! Hit, stale and corrupt-entry rules
//!
//! Rules, first match wins:
//! 1. refresh requested: miss
//! 2. no `result.json`: miss
//! 3. TTL set and `meta.json` parses as JSON: stale if `now - created_at > ttl`,
//!    where a missing or non-numeric `created_at` counts as 0
//! 4. TTL set but `meta.json` missing or not JSON: age is unknown, keep going
//! 5. read `result.json`; any failure is a miss, never an error

use crate::store::{Artifact, EntryLocation};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Field injected into object results served from the cache
pub const FROM_CACHE_FIELD: &str = "_from_cache";

/// Why an entry could not be served
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MissReason {
    /// The caller asked to bypass the cache
    Refresh,
    /// No result artifact on disk
    Absent,
    /// Entry is older than the TTL
    Stale {
        /// Age of the entry in seconds
        age_secs: f64,
    },
    /// The result artifact could not be read or parsed
    Corrupt,
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refresh => f.write_str("refresh"),
            Self::Absent => f.write_str("absent"),
            Self::Stale { age_secs } => write!(f, "stale ({age_secs:.1}s old)"),
            Self::Corrupt => f.write_str("corrupt"),
        }
    }
}

/// Outcome of checking an entry
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Stored result, as read from disk
    Hit(Value),
    /// Result must be fetched
    Miss(MissReason),
}

impl Decision {
    /// Whether this is a hit
    #[must_use]
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

/// Decide whether the entry at `location` can be served
///
/// `now` is the current time in seconds since the Unix epoch.
#[must_use]
pub fn decide(location: &EntryLocation, refresh: bool, ttl: Option<Duration>, now: f64) -> Decision {
    if refresh {
        return Decision::Miss(MissReason::Refresh);
    }
    if !location.exists(Artifact::Result) {
        return Decision::Miss(MissReason::Absent);
    }

    if let Some(ttl) = ttl {
        match location.created_at() {
            Ok(created_at) => {
                let age_secs = now - created_at;
                if age_secs > ttl.as_secs_f64() {
                    return Decision::Miss(MissReason::Stale { age_secs });
                }
            }
            Err(e) => {
                tracing::debug!(
                    dir = %location.dir().display(),
                    "Metadata unreadable, TTL not applied: {e}"
                );
            }
        }
    }

    match location.read(Artifact::Result) {
        Ok(result) => Decision::Hit(result),
        Err(e) => {
            tracing::warn!(
                step = location.step(),
                key = %location.key(),
                "Ignoring corrupt cache entry: {e}"
            );
            Decision::Miss(MissReason::Corrupt)
        }
    }
}

/// Flag an object result as served from the cache
///
/// Non-object results are returned unchanged.
#[must_use]
pub fn mark_from_cache(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        map.insert(FROM_CACHE_FIELD.to_string(), Value::Bool(true));
    }
    value
}

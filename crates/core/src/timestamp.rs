use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::CoreError;

/// Returns the current wall-clock time as milliseconds since Unix epoch.
pub fn physical_now() -> Result<u64, CoreError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .map_err(|_| CoreError::InvalidTimestamp("system clock before epoch".into()))
}

/// Creation time of an action: wall-clock milliseconds plus a logical counter
/// that separates actions stamped within the same millisecond.
///
/// Not unique across actions. Text form is `"{wall_ms}.{counter}"`.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Default)]
pub struct Timestamp {
    wall_ms: u64,
    counter: u32,
}

impl Timestamp {
    pub fn new(wall_ms: u64, counter: u32) -> Self {
        Self { wall_ms, counter }
    }

    pub fn from_millis(wall_ms: u64) -> Self {
        Self { wall_ms, counter: 0 }
    }

    pub fn wall_ms(&self) -> u64 {
        self.wall_ms
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn to_key(&self) -> String {
        format!("{}.{}", self.wall_ms, self.counter)
    }

    /// Parse `"{wall_ms}.{counter}"`; a bare `"{wall_ms}"` means counter 0.
    pub fn parse_key(key: &str) -> Result<Self, CoreError> {
        let (wall, counter) = match key.split_once('.') {
            Some((wall, counter)) => (wall, Some(counter)),
            None => (key, None),
        };
        let wall_ms = wall
            .parse::<u64>()
            .map_err(|e| CoreError::InvalidTimestamp(format!("{key:?}: {e}")))?;
        let counter = match counter {
            Some(c) => c
                .parse::<u32>()
                .map_err(|e| CoreError::InvalidTimestamp(format!("{key:?}: {e}")))?,
            None => 0,
        };
        Ok(Self { wall_ms, counter })
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.wall_ms
            .cmp(&other.wall_ms)
            .then(self.counter.cmp(&other.counter))
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.wall_ms, self.counter)
    }
}

impl FromStr for Timestamp {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_key(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_key())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        Timestamp::parse_key(&key).map_err(serde::de::Error::custom)
    }
}

/// Stamps locally created actions so they sort after everything already seen.
pub struct TimestampClock {
    wall_ms: u64,
    counter: u32,
}

impl TimestampClock {
    pub fn new() -> Self {
        Self {
            wall_ms: 0,
            counter: 0,
        }
    }

    /// Generate the next monotonically increasing timestamp.
    pub fn tick(&mut self) -> Result<Timestamp, CoreError> {
        let now = physical_now()?;

        let ts = if now > self.wall_ms {
            Timestamp::new(now, 0)
        } else if let Some(counter) = self.counter.checked_add(1) {
            Timestamp::new(self.wall_ms, counter)
        } else {
            // Counter exhausted: carry into the next millisecond.
            let wall_ms = self.wall_ms.checked_add(1).ok_or_else(|| {
                CoreError::InvalidTimestamp(format!("no timestamp after {}.{}", self.wall_ms, self.counter))
            })?;
            Timestamp::new(wall_ms, 0)
        };

        self.wall_ms = ts.wall_ms;
        self.counter = ts.counter;
        Ok(ts)
    }

    /// Fold in a timestamp seen elsewhere so the next tick lands after it.
    pub fn observe(&mut self, seen: Timestamp) {
        if Timestamp::new(self.wall_ms, self.counter) < seen {
            self.wall_ms = seen.wall_ms;
            self.counter = seen.counter;
        }
    }
}

impl Default for TimestampClock {
    fn default() -> Self {
        Self::new()
    }
}

//! Task data structure and id allocation.
//!
//! A `Task` is a single entry of the persisted list. The on-disk field names
//! (`createdAt` in particular) are fixed by the JSON document format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub text: String,
    pub completed: bool,
    #[serde(rename = "createdAt", with = "iso_millis")]
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create an incomplete task. `text` is expected to be trimmed and non-empty.
    pub fn new(id: u64, text: String, created_at: DateTime<Utc>) -> Self {
        Task {
            id,
            text,
            completed: false,
            created_at,
        }
    }
}

/// Hands out task ids: creation time in Unix milliseconds, bumped past the
/// last id issued so two tasks created in the same millisecond stay distinct.
#[derive(Debug, Default, Clone)]
pub struct IdClock {
    last: u64,
}

impl IdClock {
    /// Seed the clock past every id already present in `tasks`.
    pub fn seeded(tasks: &[Task]) -> Self {
        IdClock {
            last: tasks.iter().map(|t| t.id).max().unwrap_or(0),
        }
    }

    /// Next id for a task created at `now`. Once `u64::MAX` has been issued
    /// the clock stays there.
    pub fn next(&mut self, now: DateTime<Utc>) -> u64 {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        let id = millis.max(self.last.saturating_add(1));
        self.last = id;
        id
    }
}

/// `createdAt` as an ISO-8601 UTC string with millisecond precision.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

//! Gallery entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A completed generation kept in the gallery.
///
/// Field names on disk follow the gallery's existing storage layout
/// (`timestamp`, `filter`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryEntry {
    /// Unique identifier.
    pub id: i64,
    /// The generated image as a `data:` URI.
    #[serde(rename = "data")]
    pub artifact_data: String,
    /// Creation time in epoch milliseconds.
    #[serde(rename = "timestamp")]
    pub created_at: i64,
    /// Name of the style preset used.
    #[serde(rename = "filter")]
    pub style_name: String,
}

impl GalleryEntry {
    /// Creates an entry.
    pub fn new(
        id: i64,
        artifact_data: impl Into<String>,
        created_at: i64,
        style_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            artifact_data: artifact_data.into(),
            created_at,
            style_name: style_name.into(),
        }
    }

    /// Whether the entry is past `retention` at `now`.
    pub fn is_expired(&self, now: i64, retention: Duration) -> bool {
        now - self.created_at >= retention_millis(retention)
    }

    /// Time left before expiry at `now`. Negative once expired.
    pub fn time_remaining(&self, now: i64, retention: Duration) -> TimeRemaining {
        TimeRemaining {
            millis: retention_millis(retention) - (now - self.created_at),
        }
    }
}

pub(crate) fn retention_millis(retention: Duration) -> i64 {
    i64::try_from(retention.as_millis()).unwrap_or(i64::MAX)
}

/// Display-only countdown until a gallery entry expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRemaining {
    /// Remaining milliseconds; negative when already expired.
    pub millis: i64,
}

impl TimeRemaining {
    /// Whole minutes, rounded down.
    pub fn minutes(&self) -> i64 {
        self.millis.div_euclid(60_000)
    }
}

impl fmt::Display for TimeRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m left", self.minutes())
    }
}

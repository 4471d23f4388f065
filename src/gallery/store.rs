//! The gallery: a time-bounded, most-recent-first collection of results.

use crate::clock::Clock;
use crate::error::Result;
use crate::gallery::entry::{GalleryEntry, TimeRemaining};
use crate::gallery::storage::KeyValueStore;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Store key holding the JSON array of entries.
pub const GALLERY_KEY: &str = "galleryImages";

struct State {
    entries: Vec<GalleryEntry>,
    last_id: i64,
}

/// Persisted gallery of completed generations.
///
/// One instance per session, passed by reference. Expired entries are pruned
/// whenever the gallery is loaded or saved, and never returned by lookups;
/// there is no background eviction.
/// Persistence is a whole-collection read-modify-write with no cross-process
/// coordination, so concurrent writers can lose updates.
pub struct Gallery {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    retention: Duration,
    state: Mutex<State>,
}

impl Gallery {
    /// Opens the gallery and performs an initial load.
    pub fn open(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        retention: Duration,
    ) -> Self {
        let gallery = Self {
            store,
            clock,
            retention,
            state: Mutex::new(State {
                entries: Vec::new(),
                last_id: 0,
            }),
        };
        gallery.load();
        gallery
    }

    /// Reloads from the store, dropping expired entries.
    ///
    /// Writes the pruned collection back only when something was removed.
    /// Never fails: unreadable state is logged and treated as empty.
    pub fn load(&self) -> Vec<GalleryEntry> {
        let persisted = self.read_persisted();
        let now = self.clock.now_millis();
        let read_len = persisted.len();

        let valid: Vec<GalleryEntry> = persisted
            .into_iter()
            .filter(|e| !e.is_expired(now, self.retention))
            .collect();

        if valid.len() != read_len {
            tracing::debug!(
                pruned = read_len - valid.len(),
                remaining = valid.len(),
                "pruning expired gallery entries"
            );
            if let Err(e) = self.write_persisted(&valid) {
                tracing::warn!(error = %e, "failed to write pruned gallery");
            }
        }

        let mut state = self.state.lock();
        state.last_id = valid.iter().map(|e| e.id).fold(state.last_id, i64::max);
        state.entries = valid.clone();
        valid
    }

    /// Prepends `entry` to the persisted and in-memory collections.
    ///
    /// On a rejected write (e.g. [`crate::MagEditError::Quota`]) the in-memory
    /// view is left untouched and the error returned. The entry is not retried.
    pub fn save(&self, entry: GalleryEntry) -> Result<()> {
        let now = self.clock.now_millis();
        let id = entry.id;
        let mut updated = self.read_persisted();
        updated.insert(0, entry);
        updated.retain(|e| !e.is_expired(now, self.retention));

        self.write_persisted(&updated)?;

        let mut state = self.state.lock();
        state.last_id = state.last_id.max(id);
        state.entries = updated;
        Ok(())
    }

    /// Removes the entry with `id`. Absent ids are a no-op.
    ///
    /// The persisted collection is written first; on failure the in-memory
    /// view still holds the entry.
    pub fn remove(&self, id: i64) -> Result<()> {
        let mut persisted = self.read_persisted();
        let persisted_len = persisted.len();
        persisted.retain(|e| e.id != id);
        if persisted.len() != persisted_len {
            self.write_persisted(&persisted)?;
        }

        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|e| e.id != id);
        if state.entries.len() != before {
            tracing::debug!(id, "removed gallery entry");
        }
        Ok(())
    }

    /// Unexpired entries of the in-memory view, most recent first.
    pub fn entries(&self) -> Vec<GalleryEntry> {
        let now = self.clock.now_millis();
        self.state
            .lock()
            .entries
            .iter()
            .filter(|e| !e.is_expired(now, self.retention))
            .cloned()
            .collect()
    }

    /// Looks up an unexpired entry in the in-memory view.
    pub fn get(&self, id: i64) -> Option<GalleryEntry> {
        let now = self.clock.now_millis();
        self.state
            .lock()
            .entries
            .iter()
            .find(|e| e.id == id && !e.is_expired(now, self.retention))
            .cloned()
    }

    /// Number of unexpired entries in the in-memory view.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether the in-memory view is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds a new entry stamped with the current time and a fresh id.
    ///
    /// Ids are `max(now, last_id + 1)`, so two results in the same
    /// millisecond still get distinct ids.
    pub fn new_entry(
        &self,
        artifact_data: impl Into<String>,
        style_name: impl Into<String>,
    ) -> GalleryEntry {
        let now = self.clock.now_millis();
        let mut state = self.state.lock();
        let id = now.max(state.last_id + 1);
        state.last_id = id;
        GalleryEntry::new(id, artifact_data, now, style_name)
    }

    /// Display countdown for `entry`. Not authoritative for filtering.
    pub fn time_remaining(&self, entry: &GalleryEntry) -> TimeRemaining {
        entry.time_remaining(self.clock.now_millis(), self.retention)
    }

    /// Retention window applied on load.
    pub fn retention(&self) -> Duration {
        self.retention
    }

    fn read_persisted(&self) -> Vec<GalleryEntry> {
        let raw = match self.store.get(GALLERY_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read gallery");
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse gallery");
                Vec::new()
            }
        }
    }

    fn write_persisted(&self, entries: &[GalleryEntry]) -> Result<()> {
        let raw = serde_json::to_string(entries)?;
        self.store.set(GALLERY_KEY, &raw)
    }
}

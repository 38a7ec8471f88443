//! Persisted countdown state: the bootstrapped start day and the notes map.
//!
//! Persistence goes through [`KeyValueStore`], an opaque string store. What
//! comes back from it is untrusted text and is validated here before any of
//! it reaches the rest of the crate.

use std::collections::{BTreeMap, HashMap};

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::day::{CalendarDay, DayKey, decode_key, encode_key};

pub const DEFAULT_START_KEY: &str = "graduation-countdown-start";
pub const DEFAULT_NOTES_KEY: &str = "graduation-day-notes";

const BULLET_MARKERS: [char; 3] = ['-', '*', '•'];

pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Names of the two logical keys in the backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub start_key: String,
    pub notes_key: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            start_key: DEFAULT_START_KEY.to_string(),
            notes_key: DEFAULT_NOTES_KEY.to_string(),
        }
    }
}

/// Splits raw editor text into notes.
///
/// Each line loses at most one bullet marker in its first column, then
/// surrounding whitespace; blank lines are dropped.
pub fn normalize_notes(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| line.strip_prefix(BULLET_MARKERS).unwrap_or(line).trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Bullet list form of `notes`. Feeding it back through [`normalize_notes`]
/// returns `notes` unchanged.
pub fn render_bullets(notes: &[String]) -> String {
    notes
        .iter()
        .map(|note| format!("• {note}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Day key to ordered notes. A key is present only while it has notes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NotesStore {
    entries: BTreeMap<DayKey, Vec<String>>,
}

impl NotesStore {
    /// Parses persisted JSON, dropping anything that is not a day key mapped
    /// to a list of strings. Stored notes are kept as written apart from
    /// blank ones. Never fails.
    #[tracing::instrument(skip(raw))]
    pub fn from_json(raw: &str) -> Self {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "persisted notes are not valid JSON; starting empty");
                return Self::default();
            }
        };

        let Value::Object(map) = value else {
            warn!("persisted notes are not a key-to-list mapping; starting empty");
            return Self::default();
        };

        let mut store = Self::default();
        for (raw_key, raw_items) in map {
            let key = match DayKey::parse(&raw_key) {
                Ok(key) => key,
                Err(err) => {
                    warn!(key = %raw_key, error = %err, "dropping notes under invalid day key");
                    continue;
                }
            };

            let Some(items) = string_list(&raw_items) else {
                warn!(key = %key, "dropping notes that are not a list of strings");
                continue;
            };

            let notes: Vec<String> = items
                .into_iter()
                .filter(|item| !item.trim().is_empty())
                .map(str::to_string)
                .collect();
            if notes.is_empty() {
                debug!(key = %key, "dropping empty note list");
                continue;
            }
            store.entries.entry(key).or_default().extend(notes);
        }

        debug!(days = store.entries.len(), "loaded notes");
        store
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.entries)
    }

    pub fn get(&self, key: &DayKey) -> &[String] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn count(&self, key: &DayKey) -> usize {
        self.get(key).len()
    }

    pub fn contains(&self, key: &DayKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DayKey, &[String])> {
        self.entries.iter().map(|(key, notes)| (key, notes.as_slice()))
    }

    /// Replaces the notes for `key` with the normalized lines of `raw`,
    /// removing the key when nothing is left.
    pub fn set_notes(&mut self, key: DayKey, raw: &str) -> &[String] {
        let notes = normalize_notes(raw);
        if notes.is_empty() {
            self.entries.remove(&key);
            return &[];
        }
        let slot = self.entries.entry(key).or_default();
        *slot = notes;
        slot.as_slice()
    }

    pub fn remove(&mut self, key: &DayKey) -> bool {
        self.entries.remove(key).is_some()
    }
}

fn string_list(value: &Value) -> Option<Vec<&str>> {
    value.as_array()?.iter().map(Value::as_str).collect()
}

/// Outcome of [`resolve_start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartResolution {
    pub start: CalendarDay,
    /// Set when the stored key was missing or invalid and `start` still
    /// needs persisting.
    pub bootstrapped: bool,
}

/// Keeps a stored start day when it decodes and is not after `deadline`,
/// otherwise falls back to `min(today, deadline)`.
pub fn resolve_start(
    today: CalendarDay,
    deadline: CalendarDay,
    stored_key: Option<&str>,
) -> StartResolution {
    if let Some(raw) = stored_key {
        match decode_key(raw) {
            Ok(start) if start <= deadline => {
                return StartResolution {
                    start,
                    bootstrapped: false,
                };
            }
            Ok(start) => {
                warn!(start = %start, deadline = %deadline, "stored start is after the deadline");
            }
            Err(err) => {
                warn!(error = %err, "stored start key is invalid");
            }
        }
    }

    StartResolution {
        start: today.min(deadline),
        bootstrapped: true,
    }
}

/// Single owner of the persisted start day and notes.
#[derive(Debug)]
pub struct CountdownStateStore<S> {
    backend: S,
    keys: StorageKeys,
    notes: NotesStore,
}

impl<S: KeyValueStore> CountdownStateStore<S> {
    pub fn open(backend: S, keys: StorageKeys) -> Self {
        let mut store = Self {
            backend,
            keys,
            notes: NotesStore::default(),
        };
        store.notes = store.load_notes();
        store
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn notes(&self) -> &NotesStore {
        &self.notes
    }

    /// Returns the countdown start, bootstrapping and persisting it when the
    /// stored value is absent or unusable. A failed write is logged and the
    /// resolved day is still returned.
    #[tracing::instrument(skip(self))]
    pub fn resolve_start(&mut self, today: CalendarDay, deadline: CalendarDay) -> CalendarDay {
        let stored = self.read(&self.keys.start_key);
        let resolution = resolve_start(today, deadline, stored.as_deref());

        if resolution.bootstrapped {
            let encoded = encode_key(resolution.start);
            match self.backend.set(&self.keys.start_key, encoded.as_str()) {
                Ok(()) => info!(start = %encoded, "bootstrapped countdown start"),
                Err(err) => {
                    warn!(start = %encoded, error = %err, "failed to persist countdown start")
                }
            }
        }

        resolution.start
    }

    /// Reads the notes from the backend, degrading to an empty store.
    #[tracing::instrument(skip(self))]
    pub fn load_notes(&self) -> NotesStore {
        match self.read(&self.keys.notes_key) {
            Some(raw) if !raw.trim().is_empty() => NotesStore::from_json(&raw),
            _ => NotesStore::default(),
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn save_notes(&mut self) -> anyhow::Result<()> {
        let payload = self
            .notes
            .to_json()
            .context("failed to serialize notes")?;
        self.backend
            .set(&self.keys.notes_key, &payload)
            .with_context(|| format!("failed to persist {}", self.keys.notes_key))?;
        debug!(days = self.notes.len(), "saved notes");
        Ok(())
    }

    /// Normalizes `raw` into the notes of `key` and persists the whole map.
    /// The in-memory update stands even when persisting fails.
    #[tracing::instrument(skip(self, key, raw), fields(key = %key))]
    pub fn set_notes(&mut self, key: DayKey, raw: &str) -> anyhow::Result<&NotesStore> {
        let count = self.notes.set_notes(key, raw).len();
        debug!(count, "updated notes");
        self.save_notes()?;
        Ok(&self.notes)
    }

    #[tracing::instrument(skip(self, key), fields(key = %key))]
    pub fn clear_notes(&mut self, key: &DayKey) -> anyhow::Result<bool> {
        let removed = self.notes.remove(key);
        if removed {
            self.save_notes()?;
        }
        Ok(removed)
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "failed reading persisted value");
                None
            }
        }
    }
}

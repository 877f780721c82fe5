//! Append-only activity log shared by export, import and backend operations.
//!
//! Entries are kept newest first and capped at [`MAX_ENTRIES`]; appending past
//! the cap evicts the oldest entry. The log is an injected sink ([`LogSink`])
//! owned by the caller, never a process-wide singleton.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Maximum number of entries retained.
pub const MAX_ENTRIES: usize = 100;

const CLEARED_MESSAGE: &str = "All logs cleared";

/// A single timestamped activity event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    /// Human-readable 24h wall-clock time (`HH:MM:SS`).
    pub time: String,
    /// Event message.
    pub message: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl ActivityLogEntry {
    /// Creates an entry stamped with the current local time.
    #[must_use]
    pub fn now(message: impl Into<String>) -> Self {
        Self::at(message, Local::now())
    }

    /// Creates an entry stamped with an explicit time.
    #[must_use]
    pub fn at(message: impl Into<String>, when: DateTime<Local>) -> Self {
        Self {
            time: when.format("%H:%M:%S").to_string(),
            message: message.into(),
            timestamp: when.timestamp_millis(),
        }
    }
}

/// Destination for activity events.
pub trait LogSink: Send + Sync {
    /// Appends an entry.
    fn append(&self, entry: ActivityLogEntry);

    /// Appends a message stamped with the current time.
    fn log(&self, message: &str) {
        self.append(ActivityLogEntry::now(message));
    }
}

/// Errors loading or persisting the activity log.
#[derive(Debug, thiserror::Error)]
pub enum ActivityLogError {
    /// Filesystem I/O failed.
    #[error("activity log I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// Persisted log is not valid JSON.
    #[error("activity log file is corrupted: {0}")]
    Json(#[from] serde_json::Error),
}

/// Capped, newest-first activity log with optional JSON file persistence.
#[derive(Debug, Default)]
pub struct ActivityLog {
    entries: Mutex<VecDeque<ActivityLogEntry>>,
    path: Option<PathBuf>,
}

impl ActivityLog {
    /// Creates an empty in-memory log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a file-backed log, loading existing entries when the file exists.
    ///
    /// # Errors
    ///
    /// Returns [`ActivityLogError`] when the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ActivityLogError> {
        let path = path.into();
        let mut entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                VecDeque::new()
            } else {
                serde_json::from_str::<VecDeque<ActivityLogEntry>>(&raw)?
            }
        } else {
            VecDeque::new()
        };
        entries.truncate(MAX_ENTRIES);

        Ok(Self {
            entries: Mutex::new(entries),
            path: Some(path),
        })
    }

    /// Returns the backing file path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns a copy of all entries, newest first.
    #[must_use]
    pub fn entries(&self) -> Vec<ActivityLogEntry> {
        self.lock().iter().cloned().collect()
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the log has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops all entries, leaving a single entry recording the clear.
    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.clear();
        entries.push_front(ActivityLogEntry::now(CLEARED_MESSAGE));
        self.persist_locked(&entries);
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ActivityLogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist_locked(&self, entries: &VecDeque<ActivityLogEntry>) {
        let Some(path) = self.path.as_deref() else {
            return;
        };
        if let Err(error) = write_entries(path, entries) {
            warn!(path = %path.display(), error = %error, "failed to persist activity log");
        }
    }
}

impl LogSink for ActivityLog {
    fn append(&self, entry: ActivityLogEntry) {
        info!(target: "activity", "{}", entry.message);
        let mut entries = self.lock();
        entries.push_front(entry);
        entries.truncate(MAX_ENTRIES);
        self.persist_locked(&entries);
    }
}

fn write_entries(path: &Path, entries: &VecDeque<ActivityLogEntry>) -> Result<(), ActivityLogError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let payload = serde_json::to_vec(entries)?;
    fs::write(path, payload)?;
    Ok(())
}

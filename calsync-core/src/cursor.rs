//! Sync cursor persistence.
//!
//! A cursor is the opaque continuation token the provider hands back on the
//! final page of a completed sync pass. The engine never inspects it; it
//! only needs `get`/`set`/`commit` keyed per calendar. Mutations are staged
//! in memory and only `commit()` makes them durable, so a crash mid-run
//! leaves the previously committed cursor intact and the next run re-fetches
//! overlapping data instead of skipping events.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{SyncError, SyncResult};

pub trait CursorStore {
    fn get(&self, calendar_id: &str) -> Option<String>;
    fn set(&mut self, calendar_id: &str, cursor: &str);
    fn clear(&mut self, calendar_id: &str);
    /// Durably persist all staged mutations.
    fn commit(&mut self) -> SyncResult<()>;
}

fn cursor_key(calendar_id: &str) -> String {
    format!("cursor_for_calendar_{calendar_id}")
}

/// File-backed cursor store: one JSON map of namespaced keys.
#[derive(Debug)]
pub struct FileCursorStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileCursorStore {
    /// Load the store, starting empty if the file does not exist yet.
    pub fn load(path: &Path) -> SyncResult<Self> {
        let entries = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_json::from_str(&contents).map_err(|e| {
                SyncError::Serialization(format!(
                    "Failed to parse cursor store at {}: {}",
                    path.display(),
                    e
                ))
            })?
        } else {
            BTreeMap::new()
        };

        Ok(FileCursorStore {
            path: path.to_path_buf(),
            entries,
        })
    }
}

impl CursorStore for FileCursorStore {
    fn get(&self, calendar_id: &str) -> Option<String> {
        self.entries.get(&cursor_key(calendar_id)).cloned()
    }

    fn set(&mut self, calendar_id: &str, cursor: &str) {
        self.entries.insert(cursor_key(calendar_id), cursor.to_string());
    }

    fn clear(&mut self, calendar_id: &str) {
        self.entries.remove(&cursor_key(calendar_id));
    }

    fn commit(&mut self) -> SyncResult<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let contents = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| SyncError::Serialization(e.to_string()))?;

        // Write to a temp file first, then rename: on POSIX systems the
        // rename is atomic on the same filesystem, so a crash never leaves
        // a half-written store behind.
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, contents)?;
        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}

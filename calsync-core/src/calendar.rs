//! Calendar records and the local registry.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// A locally registered calendar.
///
/// `slug` is the local identifier; `calendar_id` is the provider's. The
/// sync cursor lives in the cursor store, not on this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Calendar {
    pub slug: String,
    pub calendar_id: String,
    pub name: String,
    pub last_synced: Option<DateTime<Utc>>,
}

impl Calendar {
    pub fn new(slug: &str, calendar_id: &str, name: &str) -> Self {
        Calendar {
            slug: slug.to_string(),
            calendar_id: calendar_id.to_string(),
            name: name.to_string(),
            last_synced: None,
        }
    }

    pub fn mark_synced(&mut self, at: DateTime<Utc>) {
        self.last_synced = Some(at);
    }
}

/// The set of registered calendars, persisted as one JSON file.
#[derive(Debug)]
pub struct CalendarRegistry {
    path: PathBuf,
    calendars: Vec<Calendar>,
}

impl CalendarRegistry {
    /// Load the registry, starting empty if the file does not exist yet.
    pub fn load(path: &Path) -> SyncResult<Self> {
        let calendars = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_json::from_str(&contents).map_err(|e| {
                SyncError::Serialization(format!(
                    "Failed to parse calendar registry at {}: {}",
                    path.display(),
                    e
                ))
            })?
        } else {
            Vec::new()
        };

        Ok(CalendarRegistry {
            path: path.to_path_buf(),
            calendars,
        })
    }

    pub fn save(&self) -> SyncResult<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let contents = serde_json::to_string_pretty(&self.calendars)
            .map_err(|e| SyncError::Serialization(e.to_string()))?;

        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, contents)?;
        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }

    pub fn calendars(&self) -> &[Calendar] {
        &self.calendars
    }

    pub fn calendars_mut(&mut self) -> &mut [Calendar] {
        &mut self.calendars
    }

    pub fn find(&self, slug: &str) -> Option<&Calendar> {
        self.calendars.iter().find(|c| c.slug == slug)
    }

    pub fn find_mut(&mut self, slug: &str) -> Option<&mut Calendar> {
        self.calendars.iter_mut().find(|c| c.slug == slug)
    }

    /// Register a calendar; the slug must be unused.
    pub fn add(&mut self, calendar: Calendar) -> SyncResult<()> {
        if self.find(&calendar.slug).is_some() {
            return Err(SyncError::Config(format!(
                "Calendar '{}' is already registered",
                calendar.slug
            )));
        }
        self.calendars.push(calendar);
        self.calendars.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(())
    }

    /// Unregister and return the calendar so the caller can cascade
    /// (delete its events and clear its cursor).
    pub fn remove(&mut self, slug: &str) -> Option<Calendar> {
        let index = self.calendars.iter().position(|c| c.slug == slug)?;
        Some(self.calendars.remove(index))
    }
}

//! Local event storage port and the file-backed implementation.
//!
//! The engine only needs keyed upsert/delete by remote event id scoped to a
//! calendar, one batched lookup per page, and listing for reporting. The
//! file implementation keeps one JSON map per calendar and rewrites it
//! atomically on every mutation, so reconciliation can be safely re-applied
//! after a crash.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::{SyncError, SyncResult};
use crate::event::{EventStatus, StoredEvent};

pub trait EventStore {
    /// Batched lookup: all stored events of `calendar` whose remote id is
    /// in `event_ids`.
    fn find_by_event_ids(
        &mut self,
        calendar: &str,
        event_ids: &[&str],
    ) -> SyncResult<Vec<StoredEvent>>;

    /// Insert or fully replace the record with `event.event_id`.
    fn upsert(&mut self, event: StoredEvent) -> SyncResult<()>;

    fn delete(&mut self, calendar: &str, event_id: &str) -> SyncResult<()>;

    fn list(&mut self, calendar: &str) -> SyncResult<Vec<StoredEvent>>;

    fn list_by_status(
        &mut self,
        calendar: &str,
        status: EventStatus,
    ) -> SyncResult<Vec<StoredEvent>> {
        Ok(self
            .list(calendar)?
            .into_iter()
            .filter(|event| event.state == status)
            .collect())
    }

    /// Remove every event of `calendar` (calendar deletion cascade).
    fn delete_calendar(&mut self, calendar: &str) -> SyncResult<()>;
}

/// Events stored as one JSON file per calendar under a data directory.
#[derive(Debug)]
pub struct JsonEventStore {
    dir: PathBuf,
    cache: HashMap<String, BTreeMap<String, StoredEvent>>,
}

impl JsonEventStore {
    pub fn new(dir: &Path) -> Self {
        JsonEventStore {
            dir: dir.to_path_buf(),
            cache: HashMap::new(),
        }
    }

    fn file_path(&self, calendar: &str) -> PathBuf {
        self.dir.join(format!("{calendar}.events.json"))
    }

    fn load_calendar(&mut self, calendar: &str) -> SyncResult<&mut BTreeMap<String, StoredEvent>> {
        if !self.cache.contains_key(calendar) {
            let path = self.file_path(calendar);
            let events = if path.exists() {
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| SyncError::Storage(e.to_string()))?;
                serde_json::from_str(&contents).map_err(|e| {
                    SyncError::Storage(format!(
                        "Failed to parse event store at {}: {}",
                        path.display(),
                        e
                    ))
                })?
            } else {
                BTreeMap::new()
            };
            self.cache.insert(calendar.to_string(), events);
        }

        // unwrap safe: inserted above
        Ok(self.cache.get_mut(calendar).unwrap())
    }

    fn persist(&self, calendar: &str) -> SyncResult<()> {
        let Some(map) = self.cache.get(calendar) else {
            return Ok(());
        };

        std::fs::create_dir_all(&self.dir).map_err(|e| SyncError::Storage(e.to_string()))?;

        let path = self.file_path(calendar);
        let contents = serde_json::to_string_pretty(map)
            .map_err(|e| SyncError::Serialization(e.to_string()))?;

        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, contents).map_err(|e| SyncError::Storage(e.to_string()))?;
        std::fs::rename(&temp_path, &path).map_err(|e| SyncError::Storage(e.to_string()))?;

        Ok(())
    }
}

impl EventStore for JsonEventStore {
    fn find_by_event_ids(
        &mut self,
        calendar: &str,
        event_ids: &[&str],
    ) -> SyncResult<Vec<StoredEvent>> {
        let events = self.load_calendar(calendar)?;
        Ok(event_ids
            .iter()
            .filter_map(|id| events.get(*id).cloned())
            .collect())
    }

    fn upsert(&mut self, event: StoredEvent) -> SyncResult<()> {
        let calendar = event.calendar.clone();
        let events = self.load_calendar(&calendar)?;
        events.insert(event.event_id.clone(), event);
        self.persist(&calendar)
    }

    fn delete(&mut self, calendar: &str, event_id: &str) -> SyncResult<()> {
        let events = self.load_calendar(calendar)?;
        if events.remove(event_id).is_some() {
            self.persist(calendar)?;
        }
        Ok(())
    }

    fn list(&mut self, calendar: &str) -> SyncResult<Vec<StoredEvent>> {
        let events = self.load_calendar(calendar)?;
        Ok(events.values().cloned().collect())
    }

    fn delete_calendar(&mut self, calendar: &str) -> SyncResult<()> {
        self.cache.remove(calendar);
        let path = self.file_path(calendar);
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| SyncError::Storage(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Transparency, Visibility};
    use crate::identity::UserId;

    fn sample_event(calendar: &str, event_id: &str) -> StoredEvent {
        StoredEvent {
            event_id: event_id.to_string(),
            calendar: calendar.to_string(),
            user_id: UserId::ANONYMOUS,
            name: "Standup".to_string(),
            ical_id: format!("{event_id}@example"),
            link: String::new(),
            start_date: 1_709_269_200,
            end_date: 1_709_272_800,
            description: String::new(),
            location: "Room 1".to_string(),
            locked: false,
            etag: "\"1\"".to_string(),
            transparency: Transparency::Opaque,
            visibility: Visibility::Default,
            guests_invite_others: true,
            guests_modify: false,
            guests_see_invitees: true,
            state: EventStatus::Confirmed,
            organizer: "Alice".to_string(),
            organizer_email: "alice@example.com".to_string(),
            creator: "Alice".to_string(),
            creator_email: "alice@example.com".to_string(),
            created: 1_700_000_000,
            updated: 1_700_000_100,
        }
    }

    #[test]
    fn test_upsert_then_batched_lookup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = JsonEventStore::new(dir.path());

        store.upsert(sample_event("work", "a")).expect("upsert");
        store.upsert(sample_event("work", "b")).expect("upsert");
        store.upsert(sample_event("home", "a")).expect("upsert");

        let found = store
            .find_by_event_ids("work", &["a", "b", "missing"])
            .expect("lookup");
        assert_eq!(found.len(), 2);

        // Lookup is scoped to the calendar.
        let found = store.find_by_event_ids("home", &["a", "b"]).expect("lookup");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_upsert_replaces_in_full_and_survives_reload() {
        let dir = tempfile::tempdir().expect("tempdir");

        {
            let mut store = JsonEventStore::new(dir.path());
            store.upsert(sample_event("work", "a")).expect("upsert");

            let mut replacement = sample_event("work", "a");
            replacement.location = "Room 9".to_string();
            replacement.updated = 1_700_000_200;
            store.upsert(replacement).expect("upsert");
        }

        // Fresh store instance reads back from disk.
        let mut store = JsonEventStore::new(dir.path());
        let events = store.list("work").expect("list");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].location, "Room 9");
        assert_eq!(events[0].updated, 1_700_000_200);
    }

    #[test]
    fn test_delete_and_calendar_cascade() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = JsonEventStore::new(dir.path());

        store.upsert(sample_event("work", "a")).expect("upsert");
        store.upsert(sample_event("work", "b")).expect("upsert");

        store.delete("work", "a").expect("delete");
        assert_eq!(store.list("work").expect("list").len(), 1);

        // Deleting an absent id is a no-op.
        store.delete("work", "a").expect("delete");

        store.delete_calendar("work").expect("cascade");
        assert_eq!(store.list("work").expect("list").len(), 0);
        assert!(!dir.path().join("work.events.json").exists());
    }

    #[test]
    fn test_list_by_status_filters() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = JsonEventStore::new(dir.path());

        store.upsert(sample_event("work", "a")).expect("upsert");
        let mut tentative = sample_event("work", "b");
        tentative.state = EventStatus::Tentative;
        store.upsert(tentative).expect("upsert");

        let confirmed = store
            .list_by_status("work", EventStatus::Confirmed)
            .expect("list");
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].event_id, "a");
    }
}

//! Change reconciliation: map one page of remote events onto local storage.

use std::collections::HashMap;

use chrono_tz::Tz;
use log::{info, warn};

use crate::calendar::Calendar;
use crate::dates;
use crate::error::{SyncError, SyncResult};
use crate::event::{EventStatus, RemoteEvent, StoredEvent, Transparency, Visibility};
use crate::identity::{UserDirectory, UserId};
use crate::store::EventStore;

/// Counts for one reconciled page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageStats {
    pub fetched: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Malformed records skipped (unparsable start/end).
    pub skipped: usize,
}

/// Applies a batch of remote events to the local store.
///
/// The provider is the source of truth for every provider-owned field:
/// matches are overwritten in full, never merged, so a manual local edit to
/// such a field does not survive the next sync.
pub struct Reconciler<'a> {
    events: &'a mut dyn EventStore,
    users: &'a dyn UserDirectory,
}

impl<'a> Reconciler<'a> {
    pub fn new(events: &'a mut dyn EventStore, users: &'a dyn UserDirectory) -> Self {
        Reconciler { events, users }
    }

    pub fn reconcile(
        &mut self,
        calendar: &Calendar,
        remote_events: &[RemoteEvent],
        timezone: Tz,
    ) -> SyncResult<PageStats> {
        // One batched lookup for the whole page, indexed by remote id.
        let event_ids: Vec<&str> = remote_events.iter().map(|e| e.id.as_str()).collect();
        let existing = self.events.find_by_event_ids(&calendar.slug, &event_ids)?;
        let mut indexed: HashMap<String, StoredEvent> = existing
            .into_iter()
            .map(|event| (event.event_id.clone(), event))
            .collect();

        let mut stats = PageStats {
            fetched: remote_events.len(),
            ..PageStats::default()
        };

        for remote in remote_events {
            let local = indexed.remove(&remote.id);

            // Cancelled on the remote side means deleted locally; a
            // cancelled record with no local match is a no-op either way.
            if EventStatus::parse(&remote.status) == EventStatus::Cancelled {
                if local.is_some() {
                    match self.events.delete(&calendar.slug, &remote.id) {
                        Ok(()) => stats.deleted += 1,
                        Err(SyncError::StorageWrite { event_id, reason }) => {
                            warn!("Failed to delete event '{event_id}': {reason}");
                        }
                        Err(err) => return Err(err),
                    }
                }
                continue;
            }

            let Some(fields) = self.build_stored(calendar, remote, timezone) else {
                warn!(
                    "Skipping event '{}' in calendar '{}': unparsable start or end",
                    remote.id, calendar.slug
                );
                stats.skipped += 1;
                continue;
            };

            let is_new = local.is_none();
            match self.events.upsert(fields) {
                Ok(()) if is_new => stats.created += 1,
                Ok(()) => stats.updated += 1,
                Err(SyncError::StorageWrite { event_id, reason }) => {
                    warn!("Failed to save event '{event_id}': {reason}");
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            "Sync '{}': {} fetched, {} created, {} updated, {} deleted, {} skipped",
            calendar.name, stats.fetched, stats.created, stats.updated, stats.deleted,
            stats.skipped
        );

        Ok(stats)
    }

    /// Map a remote record to the full local field set, or `None` when the
    /// record is malformed.
    fn build_stored(
        &self,
        calendar: &Calendar,
        remote: &RemoteEvent,
        timezone: Tz,
    ) -> Option<StoredEvent> {
        let start_date = remote
            .start
            .as_ref()
            .and_then(|time| dates::event_time_to_epoch(time, timezone))?;
        let end_date = remote
            .end
            .as_ref()
            .and_then(|time| dates::event_time_to_epoch(time, timezone))?;

        let user_id = remote
            .organizer
            .as_ref()
            .filter(|organizer| !organizer.email.is_empty())
            .and_then(|organizer| self.users.find_by_email(&organizer.email))
            .unwrap_or(UserId::ANONYMOUS);

        let (organizer, organizer_email) = match &remote.organizer {
            Some(person) => (person.display_name.clone(), person.email.clone()),
            None => (String::new(), String::new()),
        };
        let (creator, creator_email) = match &remote.creator {
            Some(person) => (person.display_name.clone(), person.email.clone()),
            None => (String::new(), String::new()),
        };

        Some(StoredEvent {
            event_id: remote.id.clone(),
            calendar: calendar.slug.clone(),
            user_id,
            name: remote.summary.clone(),
            ical_id: remote.i_cal_uid.clone(),
            link: remote.html_link.clone(),
            start_date,
            end_date,
            description: remote.description.clone(),
            location: remote.location.clone(),
            locked: remote.locked.unwrap_or(false),
            etag: remote.etag.clone(),
            transparency: Transparency::parse(&remote.transparency),
            visibility: Visibility::parse(&remote.visibility),
            guests_invite_others: remote.guests_can_invite_others.unwrap_or(false),
            guests_modify: remote.guests_can_modify.unwrap_or(false),
            guests_see_invitees: remote.guests_can_see_other_guests.unwrap_or(false),
            state: EventStatus::parse(&remote.status),
            organizer,
            organizer_email,
            creator,
            creator_email,
            created: dates::stamp_to_epoch(&remote.created),
            updated: dates::stamp_to_epoch(&remote.updated),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{RemoteEventTime, RemotePerson};
    use crate::identity::StaticUserDirectory;
    use crate::testing::MemoryEventStore;
    use chrono::NaiveDate;

    fn calendar() -> Calendar {
        Calendar::new("work", "work@example.com", "Work")
    }

    fn tz() -> Tz {
        chrono_tz::America::New_York
    }

    fn remote_event(id: &str) -> RemoteEvent {
        RemoteEvent {
            id: id.to_string(),
            status: "confirmed".to_string(),
            summary: format!("Event {id}"),
            location: "Room 1".to_string(),
            start: Some(RemoteEventTime {
                date: None,
                date_time: Some("2024-03-01T10:00:00-05:00".to_string()),
            }),
            end: Some(RemoteEventTime {
                date: None,
                date_time: Some("2024-03-01T11:00:00-05:00".to_string()),
            }),
            created: "2024-02-01T08:00:00.000Z".to_string(),
            updated: "2024-02-20T08:00:00.000Z".to_string(),
            organizer: Some(RemotePerson {
                email: "alice@example.com".to_string(),
                display_name: "Alice".to_string(),
            }),
            etag: "\"1\"".to_string(),
            ..RemoteEvent::default()
        }
    }

    fn cancelled_event(id: &str) -> RemoteEvent {
        RemoteEvent {
            id: id.to_string(),
            status: "cancelled".to_string(),
            ..RemoteEvent::default()
        }
    }

    #[test]
    fn test_creates_then_updates_in_place() {
        let mut store = MemoryEventStore::new();
        let users = StaticUserDirectory::new();
        let cal = calendar();

        let batch = vec![remote_event("a"), remote_event("b")];
        let stats = Reconciler::new(&mut store, &users)
            .reconcile(&cal, &batch, tz())
            .expect("reconcile");
        assert_eq!((stats.created, stats.updated, stats.deleted), (2, 0, 0));

        // Same batch again: both events now match locally.
        let stats = Reconciler::new(&mut store, &users)
            .reconcile(&cal, &batch, tz())
            .expect("reconcile");
        assert_eq!((stats.created, stats.updated, stats.deleted), (0, 2, 0));
        assert_eq!(store.list("work").expect("list").len(), 2);
    }

    #[test]
    fn test_cancelled_deletes_match_and_ignores_unknown() {
        let mut store = MemoryEventStore::new();
        let users = StaticUserDirectory::new();
        let cal = calendar();

        Reconciler::new(&mut store, &users)
            .reconcile(&cal, &[remote_event("a")], tz())
            .expect("seed");

        let batch = vec![cancelled_event("a"), cancelled_event("never-seen")];
        let stats = Reconciler::new(&mut store, &users)
            .reconcile(&cal, &batch, tz())
            .expect("reconcile");

        assert_eq!(stats.deleted, 1);
        assert_eq!(stats.created, 0);
        assert_eq!(stats.updated, 0);
        assert!(store.list("work").expect("list").is_empty());
    }

    #[test]
    fn test_full_replace_overwrites_local_edits() {
        let mut store = MemoryEventStore::new();
        let users = StaticUserDirectory::new();
        let cal = calendar();

        Reconciler::new(&mut store, &users)
            .reconcile(&cal, &[remote_event("a")], tz())
            .expect("seed");

        // A manual local edit to a provider-owned field...
        let mut edited = store.list("work").expect("list").remove(0);
        edited.location = "Hand-edited room".to_string();
        store.upsert(edited).expect("edit");

        // ...is overwritten in full on the next sync.
        Reconciler::new(&mut store, &users)
            .reconcile(&cal, &[remote_event("a")], tz())
            .expect("reconcile");
        let after = store.list("work").expect("list").remove(0);
        assert_eq!(after.location, "Room 1");
    }

    #[test]
    fn test_organizer_resolves_to_local_user_or_anonymous() {
        let mut store = MemoryEventStore::new();
        let mut users = StaticUserDirectory::new();
        users.insert("alice@example.com", UserId(42));
        let cal = calendar();

        let mut unknown_organizer = remote_event("b");
        unknown_organizer.organizer = Some(RemotePerson {
            email: "stranger@example.com".to_string(),
            display_name: "Stranger".to_string(),
        });

        Reconciler::new(&mut store, &users)
            .reconcile(&cal, &[remote_event("a"), unknown_organizer], tz())
            .expect("reconcile");

        let events = store.list("work").expect("list");
        let by_id = |id: &str| events.iter().find(|e| e.event_id == id).expect("event");
        assert_eq!(by_id("a").user_id, UserId(42));
        assert_eq!(by_id("b").user_id, UserId::ANONYMOUS);
    }

    #[test]
    fn test_all_day_event_normalizes_via_calendar_timezone() {
        let mut store = MemoryEventStore::new();
        let users = StaticUserDirectory::new();
        let cal = calendar();

        let mut all_day = remote_event("a");
        all_day.start = Some(RemoteEventTime {
            date: NaiveDate::from_ymd_opt(2024, 3, 1),
            date_time: None,
        });
        all_day.end = Some(RemoteEventTime {
            date: NaiveDate::from_ymd_opt(2024, 3, 2),
            date_time: None,
        });

        Reconciler::new(&mut store, &users)
            .reconcile(&cal, &[all_day], tz())
            .expect("reconcile");

        let event = store.list("work").expect("list").remove(0);
        // Midnight EST is 05:00 UTC.
        assert_eq!(event.start_date % 86_400, 5 * 3_600);
        assert_eq!(event.end_date - event.start_date, 86_400);
    }

    #[test]
    fn test_malformed_record_is_skipped_not_fatal() {
        let mut store = MemoryEventStore::new();
        let users = StaticUserDirectory::new();
        let cal = calendar();

        let mut malformed = remote_event("bad");
        malformed.start = Some(RemoteEventTime {
            date: None,
            date_time: Some("nonsense".to_string()),
        });
        let mut missing = remote_event("worse");
        missing.end = None;

        let stats = Reconciler::new(&mut store, &users)
            .reconcile(&cal, &[malformed, remote_event("good"), missing], tz())
            .expect("reconcile");

        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.created, 1);
        let events = store.list("work").expect("list");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id, "good");
    }

    #[test]
    fn test_single_write_failure_does_not_abort_batch() {
        let mut store = MemoryEventStore::new();
        store.fail_writes_for("a");
        let users = StaticUserDirectory::new();
        let cal = calendar();

        let stats = Reconciler::new(&mut store, &users)
            .reconcile(&cal, &[remote_event("a"), remote_event("b")], tz())
            .expect("reconcile");

        // The failed event counts toward neither created nor updated.
        assert_eq!(stats.created, 1);
        assert_eq!(stats.fetched, 2);
        let events = store.list("work").expect("list");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id, "b");
    }

    #[test]
    fn test_unavailable_store_aborts_batch() {
        let mut store = MemoryEventStore::new();
        store.set_unavailable();
        let users = StaticUserDirectory::new();
        let cal = calendar();

        let result =
            Reconciler::new(&mut store, &users).reconcile(&cal, &[remote_event("a")], tz());
        assert!(matches!(result, Err(SyncError::Storage(_))));
    }

    #[test]
    fn test_created_and_updated_stamps_use_sentinel_on_garbage() {
        let mut store = MemoryEventStore::new();
        let users = StaticUserDirectory::new();
        let cal = calendar();

        let mut event = remote_event("a");
        event.created = "garbage".to_string();
        event.updated = "2024-02-20T08:00:00.000Z".to_string();

        Reconciler::new(&mut store, &users)
            .reconcile(&cal, &[event], tz())
            .expect("reconcile");

        let stored = store.list("work").expect("list").remove(0);
        assert_eq!(stored.created, 0);
        assert_ne!(stored.updated, 0);
    }
}

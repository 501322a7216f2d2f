//! In-memory test doubles for the engine's ports.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::cursor::CursorStore;
use crate::error::{SyncError, SyncResult};
use crate::event::{RemoteCalendar, StoredEvent};
use crate::fetch::{CalendarProvider, EventsPage, ListQuery, ProviderError};
use crate::store::EventStore;

/// Event store holding everything in memory, with knobs to inject the two
/// storage failure modes.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: BTreeMap<(String, String), StoredEvent>,
    fail_writes: HashSet<String>,
    unavailable: bool,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make writes for this event id fail with a per-record error.
    pub fn fail_writes_for(&mut self, event_id: &str) {
        self.fail_writes.insert(event_id.to_string());
    }

    /// Make every operation fail as if the store were down.
    pub fn set_unavailable(&mut self) {
        self.unavailable = true;
    }

    fn check_available(&self) -> SyncResult<()> {
        if self.unavailable {
            return Err(SyncError::Storage("store unavailable".to_string()));
        }
        Ok(())
    }
}

impl EventStore for MemoryEventStore {
    fn find_by_event_ids(
        &mut self,
        calendar: &str,
        event_ids: &[&str],
    ) -> SyncResult<Vec<StoredEvent>> {
        self.check_available()?;
        Ok(event_ids
            .iter()
            .filter_map(|id| {
                self.events
                    .get(&(calendar.to_string(), id.to_string()))
                    .cloned()
            })
            .collect())
    }

    fn upsert(&mut self, event: StoredEvent) -> SyncResult<()> {
        self.check_available()?;
        if self.fail_writes.contains(&event.event_id) {
            return Err(SyncError::StorageWrite {
                event_id: event.event_id,
                reason: "injected write failure".to_string(),
            });
        }
        self.events
            .insert((event.calendar.clone(), event.event_id.clone()), event);
        Ok(())
    }

    fn delete(&mut self, calendar: &str, event_id: &str) -> SyncResult<()> {
        self.check_available()?;
        if self.fail_writes.contains(event_id) {
            return Err(SyncError::StorageWrite {
                event_id: event_id.to_string(),
                reason: "injected write failure".to_string(),
            });
        }
        self.events
            .remove(&(calendar.to_string(), event_id.to_string()));
        Ok(())
    }

    fn list(&mut self, calendar: &str) -> SyncResult<Vec<StoredEvent>> {
        self.check_available()?;
        Ok(self
            .events
            .iter()
            .filter(|((cal, _), _)| cal == calendar)
            .map(|(_, event)| event.clone())
            .collect())
    }

    fn delete_calendar(&mut self, calendar: &str) -> SyncResult<()> {
        self.check_available()?;
        self.events.retain(|(cal, _), _| cal != calendar);
        Ok(())
    }
}

/// Cursor store that tracks commits so tests can assert durability points.
#[derive(Debug, Default)]
pub struct MemoryCursorStore {
    entries: BTreeMap<String, String>,
    commits: usize,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commits(&self) -> usize {
        self.commits
    }
}

impl CursorStore for MemoryCursorStore {
    fn get(&self, calendar_id: &str) -> Option<String> {
        self.entries.get(calendar_id).cloned()
    }

    fn set(&mut self, calendar_id: &str, cursor: &str) {
        self.entries.insert(calendar_id.to_string(), cursor.to_string());
    }

    fn clear(&mut self, calendar_id: &str) {
        self.entries.remove(calendar_id);
    }

    fn commit(&mut self) -> SyncResult<()> {
        self.commits += 1;
        Ok(())
    }
}

/// Provider fed a script of page responses, recording every query it sees.
#[derive(Debug, Default)]
pub struct MockProvider {
    pages: RefCell<VecDeque<Result<EventsPage, ProviderError>>>,
    queries: RefCell<Vec<ListQuery>>,
    timezone: String,
}

impl MockProvider {
    pub fn new() -> Self {
        MockProvider {
            pages: RefCell::new(VecDeque::new()),
            queries: RefCell::new(Vec::new()),
            timezone: "America/New_York".to_string(),
        }
    }

    pub fn with_page(self, page: Result<EventsPage, ProviderError>) -> Self {
        self.pages.borrow_mut().push_back(page);
        self
    }

    pub fn recorded_queries(&self) -> Vec<ListQuery> {
        self.queries.borrow().clone()
    }
}

impl CalendarProvider for MockProvider {
    async fn get_calendar(&self, calendar_id: &str) -> Result<RemoteCalendar, ProviderError> {
        Ok(RemoteCalendar {
            id: calendar_id.to_string(),
            summary: "Mock".to_string(),
            time_zone: self.timezone.clone(),
        })
    }

    async fn list_events_page(
        &self,
        _calendar_id: &str,
        query: &ListQuery,
    ) -> Result<EventsPage, ProviderError> {
        self.queries.borrow_mut().push(query.clone());
        self.pages
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Transient("script exhausted".to_string())))
    }
}

//! The sync orchestrator.
//!
//! One run is `START -> (FETCH_PAGE -> RECONCILE)* -> COMMIT_CURSOR -> DONE`,
//! aborting on unrecoverable fetch failure. Pages are processed strictly in
//! order (each page's request depends on the previous page's token), the
//! loop is capped per invocation, and the stored cursor only moves once a
//! complete pass has handed back a fresh sync token.

use chrono::Utc;
use chrono_tz::Tz;
use log::{info, warn};

use crate::calendar::Calendar;
use crate::cursor::CursorStore;
use crate::error::{SyncError, SyncResult};
use crate::fetch::{CalendarProvider, FetchError, PageFetcher};
use crate::identity::UserDirectory;
use crate::reconcile::{PageStats, Reconciler};
use crate::store::EventStore;

/// Default cap on pages fetched per invocation. Remaining pages are picked
/// up by the next scheduled run.
pub const DEFAULT_MAX_PAGES: u32 = 2;

/// Outcome of one sync run, consumed by the caller for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncRunResult {
    pub calendar: String,
    pub fetched: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub pages: u32,
    /// Whether this run completed a full pass and persisted a new cursor.
    pub cursor_advanced: bool,
}

impl SyncRunResult {
    fn absorb(&mut self, stats: PageStats) {
        self.fetched += stats.fetched;
        self.created += stats.created;
        self.updated += stats.updated;
        self.deleted += stats.deleted;
        self.skipped += stats.skipped;
    }

    pub fn has_changes(&self) -> bool {
        self.created > 0 || self.updated > 0 || self.deleted > 0
    }
}

/// Drives the fetch/reconcile loop for one calendar at a time.
///
/// All collaborators are injected; the engine holds no ambient state. Runs
/// for different calendars touch disjoint storage, but the caller must not
/// start two concurrent runs for the same calendar (the cursor
/// read-modify-write is not internally locked; see `queue::RunGuard`).
pub struct SyncEngine<'a, P> {
    provider: &'a P,
    events: &'a mut dyn EventStore,
    cursors: &'a mut dyn CursorStore,
    users: &'a dyn UserDirectory,
    max_pages: u32,
}

impl<'a, P: CalendarProvider> SyncEngine<'a, P> {
    pub fn new(
        provider: &'a P,
        events: &'a mut dyn EventStore,
        cursors: &'a mut dyn CursorStore,
        users: &'a dyn UserDirectory,
    ) -> Self {
        SyncEngine {
            provider,
            events,
            cursors,
            users,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Run one import for `calendar`.
    ///
    /// With `force_full` the stored cursor is ignored for this run but not
    /// deleted; it is only replaced once the full pass succeeds. Expected
    /// failures (provider down, storage unavailable) come back as `Err`
    /// with the stored cursor untouched, so the next scheduled run retries
    /// from the previous position.
    pub async fn import(
        &mut self,
        calendar: &mut Calendar,
        force_full: bool,
    ) -> SyncResult<SyncRunResult> {
        if calendar.calendar_id.is_empty() {
            return Err(SyncError::Contract(format!(
                "Calendar '{}' has no remote calendar id",
                calendar.slug
            )));
        }

        let cursor = if force_full {
            None
        } else {
            self.cursors.get(&calendar.calendar_id)
        };

        let remote_calendar = self
            .provider
            .get_calendar(&calendar.calendar_id)
            .await
            .map_err(|e| SyncError::Provider(e.to_string()))?;
        let timezone: Tz = remote_calendar.time_zone.parse().map_err(|_| {
            SyncError::Provider(format!(
                "Calendar '{}' has unknown timezone '{}'",
                calendar.slug, remote_calendar.time_zone
            ))
        })?;

        let mut fetcher = PageFetcher::new(self.provider, &calendar.calendar_id, cursor);
        let mut result = SyncRunResult {
            calendar: calendar.slug.clone(),
            ..SyncRunResult::default()
        };

        let mut page_token: Option<String> = None;
        let mut sync_token: Option<String> = None;

        loop {
            let page = match fetcher.fetch(page_token.as_deref()).await {
                Ok(page) => page,
                Err(FetchError::Transient(message)) => {
                    warn!(
                        "Aborting sync of '{}' after {} page(s): {}",
                        calendar.slug, result.pages, message
                    );
                    return Err(SyncError::Provider(message));
                }
            };

            result.pages += 1;
            // Only the final page of a complete pass carries a sync token;
            // whatever the last fetched page said is what counts.
            sync_token = page.next_sync_token.clone();

            if !page.items.is_empty() {
                let mut reconciler = Reconciler::new(&mut *self.events, self.users);
                let stats = reconciler.reconcile(calendar, &page.items, timezone)?;
                result.absorb(stats);
            }

            page_token = page.next_page_token;
            if page_token.is_none() || result.pages >= self.max_pages {
                break;
            }
        }

        if let Some(token) = sync_token {
            // The pass completed: advance the cursor durably and stamp the
            // calendar. A crash before this point leaves the old cursor in
            // place and the next run re-fetches; reconciliation is a safe
            // overwrite either way.
            self.cursors.set(&calendar.calendar_id, &token);
            self.cursors.commit()?;
            calendar.mark_synced(Utc::now());
            result.cursor_advanced = true;
        } else {
            info!(
                "Sync of '{}' stopped after {} page(s) mid-pass; cursor not advanced",
                calendar.slug, result.pages
            );
        }

        info!("Calendar '{}' imported successfully", calendar.slug);

        Ok(result)
    }
}

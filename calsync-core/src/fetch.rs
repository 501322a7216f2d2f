//! Page fetching against the provider's paged list-events endpoint.
//!
//! The provider itself is a black box behind [`CalendarProvider`]; this
//! module owns the request mode (incremental vs bootstrap) and the
//! full-resync fallback when the provider reports the sync cursor expired.

use chrono::{DateTime, Duration, Utc};
use log::info;
use serde::Deserialize;
use thiserror::Error;

use crate::event::{RemoteCalendar, RemoteEvent};

/// How far back a bootstrap (cursor-less) fetch reaches.
pub const BOOTSTRAP_LOOKBACK: Duration = Duration::days(1);

/// What the provider can signal for a single request.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The sync cursor is no longer valid (HTTP 410 in the observed
    /// provider); recoverable by re-fetching without a cursor.
    #[error("Sync cursor no longer valid")]
    CursorExpired,

    /// Any other provider failure; the caller decides whether to retry on a
    /// later run.
    #[error("Provider request failed: {0}")]
    Transient(String),
}

/// Fetch failure surfaced to the orchestrator. Cursor expiry never appears
/// here; the fetcher absorbs it.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Provider request failed: {0}")]
    Transient(String),
}

impl From<ProviderError> for FetchError {
    fn from(err: ProviderError) -> Self {
        FetchError::Transient(err.to_string())
    }
}

/// Query parameters for one page request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub page_token: Option<String>,
    pub sync_token: Option<String>,
    /// Expand recurring events into individual instances.
    pub single_events: bool,
    /// Order by start time (bootstrap only; requires `single_events`).
    pub order_by_start: bool,
    /// Lower bound on event start time (bootstrap only).
    pub time_min: Option<DateTime<Utc>>,
}

/// One page of the provider's event feed.
///
/// `next_sync_token` is present only on the final page of a completed sync
/// pass; intermediate pages carry `next_page_token` instead.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventsPage {
    pub items: Vec<RemoteEvent>,
    pub next_page_token: Option<String>,
    pub next_sync_token: Option<String>,
}

/// The remote calendar API, reduced to what the engine needs.
pub trait CalendarProvider {
    /// Calendar metadata; the configured timezone drives all-day
    /// normalization.
    async fn get_calendar(&self, calendar_id: &str) -> Result<RemoteCalendar, ProviderError>;

    /// One page of the event feed.
    async fn list_events_page(
        &self,
        calendar_id: &str,
        query: &ListQuery,
    ) -> Result<EventsPage, ProviderError>;
}

/// Fetches successive pages of one calendar's feed within a single run.
///
/// Holds the cursor for the run: incremental mode while a cursor is set,
/// bootstrap mode (time-window fetch) otherwise. When the provider reports
/// the cursor expired, the fetcher drops it and transparently restarts as a
/// bootstrap fetch; the page token of the dead pass is discarded with it.
pub struct PageFetcher<'a, P> {
    provider: &'a P,
    calendar_id: String,
    cursor: Option<String>,
}

impl<'a, P: CalendarProvider> PageFetcher<'a, P> {
    pub fn new(provider: &'a P, calendar_id: &str, cursor: Option<String>) -> Self {
        PageFetcher {
            provider,
            calendar_id: calendar_id.to_string(),
            cursor,
        }
    }

    fn build_query(&self, page_token: Option<&str>) -> ListQuery {
        let mut query = ListQuery {
            page_token: page_token.map(str::to_string),
            single_events: true,
            ..ListQuery::default()
        };

        match &self.cursor {
            Some(cursor) => {
                query.sync_token = Some(cursor.clone());
            }
            None => {
                query.order_by_start = true;
                query.time_min = Some(Utc::now() - BOOTSTRAP_LOOKBACK);
            }
        }

        query
    }

    pub async fn fetch(&mut self, page_token: Option<&str>) -> Result<EventsPage, FetchError> {
        let query = self.build_query(page_token);

        match self.provider.list_events_page(&self.calendar_id, &query).await {
            Ok(page) => Ok(page),
            Err(ProviderError::CursorExpired) if self.cursor.is_some() => {
                info!(
                    "Sync cursor for calendar {} expired; re-fetching from scratch",
                    self.calendar_id
                );
                self.cursor = None;
                let query = self.build_query(None);
                self.provider
                    .list_events_page(&self.calendar_id, &query)
                    .await
                    .map_err(FetchError::from)
            }
            Err(err) => Err(FetchError::from(err)),
        }
    }
}

//! Calendar v3 REST client.

use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

use calsync_core::event::RemoteCalendar;
use calsync_core::fetch::{CalendarProvider, EventsPage, ListQuery, ProviderError};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct GoogleCalendarClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl GoogleCalendarClient {
    pub fn new(base_url: &str, access_token: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(GoogleCalendarClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        })
    }

    fn calendar_url(&self, calendar_id: &str) -> Result<Url, ProviderError> {
        Url::parse(&format!("{}/calendars/{}", self.base_url, calendar_id))
            .map_err(|e| ProviderError::Transient(format!("Invalid calendar URL: {e}")))
    }

    fn events_url(&self, calendar_id: &str, query: &ListQuery) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&format!("{}/calendars/{}/events", self.base_url, calendar_id))
            .map_err(|e| ProviderError::Transient(format!("Invalid events URL: {e}")))?;

        {
            let mut pairs = url.query_pairs_mut();
            if query.single_events {
                pairs.append_pair("singleEvents", "true");
            }
            if let Some(token) = &query.page_token {
                pairs.append_pair("pageToken", token);
            }
            if let Some(token) = &query.sync_token {
                pairs.append_pair("syncToken", token);
            }
            if query.order_by_start {
                pairs.append_pair("orderBy", "startTime");
            }
            if let Some(time_min) = query.time_min {
                pairs.append_pair("timeMin", &time_min.to_rfc3339());
            }
        }

        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ProviderError> {
        debug!("GET {url}");

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        // The provider signals an expired sync token with 410 Gone.
        if response.status() == StatusCode::GONE {
            return Err(ProviderError::CursorExpired);
        }
        if !response.status().is_success() {
            return Err(ProviderError::Transient(format!(
                "Provider returned {}",
                response.status()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Transient(format!("Failed to parse response: {e}")))
    }
}

impl CalendarProvider for GoogleCalendarClient {
    async fn get_calendar(&self, calendar_id: &str) -> Result<RemoteCalendar, ProviderError> {
        let url = self.calendar_url(calendar_id)?;
        self.get_json(url).await
    }

    async fn list_events_page(
        &self,
        calendar_id: &str,
        query: &ListQuery,
    ) -> Result<EventsPage, ProviderError> {
        let url = self.events_url(calendar_id, query)?;
        self.get_json(url).await
    }
}

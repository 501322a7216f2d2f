//! Google Calendar provider adapter.
//!
//! Implements the `CalendarProvider` port over the Calendar v3 REST API.
//! Only the endpoints the sync engine needs are covered: calendar metadata
//! and the paged events list. OAuth token acquisition is out of scope; the
//! adapter reads a ready-to-use access token from its config.

pub mod api;
pub mod config;

pub use api::GoogleCalendarClient;
pub use config::ProviderConfig;

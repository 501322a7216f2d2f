//! Event types.
//!
//! `RemoteEvent` mirrors the provider's wire records (camelCase fields,
//! absent text fields arrive as empty strings). `StoredEvent` is the typed
//! local record the reconciler writes; field mapping between the two happens
//! in one place (`reconcile`), never through dynamic field names.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::identity::UserId;

/// A provider event record, as returned by the paged list-events endpoint.
///
/// Cancelled records in an incremental feed carry little more than an id and
/// a status, so everything except `id` is optional or defaultable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteEvent {
    pub id: String,
    pub status: String,
    pub summary: String,
    pub description: String,
    pub location: String,
    pub start: Option<RemoteEventTime>,
    pub end: Option<RemoteEventTime>,
    /// Timestamps such as "2010-01-09T16:06:35.311Z" (3-digit fractional
    /// seconds; see `dates::stamp_to_epoch`).
    pub created: String,
    pub updated: String,
    pub organizer: Option<RemotePerson>,
    pub creator: Option<RemotePerson>,
    pub etag: String,
    pub i_cal_uid: String,
    pub html_link: String,
    pub transparency: String,
    pub visibility: String,
    pub guests_can_invite_others: Option<bool>,
    pub guests_can_modify: Option<bool>,
    pub guests_can_see_other_guests: Option<bool>,
    pub locked: Option<bool>,
}

/// Start/end of a remote event: `date` is set only for all-day events,
/// otherwise `dateTime` holds a full instant with offset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteEventTime {
    pub date: Option<NaiveDate>,
    pub date_time: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemotePerson {
    pub email: String,
    pub display_name: String,
}

/// Calendar metadata from the provider (the configured timezone drives
/// all-day date normalization).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteCalendar {
    pub id: String,
    pub summary: String,
    pub time_zone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

impl EventStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "tentative" => EventStatus::Tentative,
            "cancelled" => EventStatus::Cancelled,
            _ => EventStatus::Confirmed,
        }
    }
}

/// Whether the event blocks time (opaque) or shows as free (transparent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transparency {
    Opaque,
    Transparent,
}

impl Transparency {
    pub fn parse(value: &str) -> Self {
        if value == "transparent" {
            Transparency::Transparent
        } else {
            Transparency::Opaque
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Default,
    Public,
    Private,
    Confidential,
}

impl Visibility {
    pub fn parse(value: &str) -> Self {
        match value {
            "public" => Visibility::Public,
            "private" => Visibility::Private,
            "confidential" => Visibility::Confidential,
            _ => Visibility::Default,
        }
    }
}

/// A locally stored calendar event.
///
/// `event_id` is the provider's stable identifier and the natural key for
/// reconciliation; an event belongs to exactly one calendar. Every
/// provider-sourced field here is overwritten in full on each sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: String,
    pub calendar: String,
    pub user_id: UserId,
    pub name: String,
    pub ical_id: String,
    pub link: String,
    /// UTC epoch seconds.
    pub start_date: i64,
    /// UTC epoch seconds.
    pub end_date: i64,
    pub description: String,
    pub location: String,
    pub locked: bool,
    pub etag: String,
    pub transparency: Transparency,
    pub visibility: Visibility,
    pub guests_invite_others: bool,
    pub guests_modify: bool,
    pub guests_see_invitees: bool,
    pub state: EventStatus,
    pub organizer: String,
    pub organizer_email: String,
    pub creator: String,
    pub creator_email: String,
    /// UTC epoch seconds; 0 when the provider value was unparsable.
    pub created: i64,
    /// UTC epoch seconds; 0 when the provider value was unparsable.
    pub updated: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_maps_unknown_to_confirmed() {
        assert_eq!(EventStatus::parse("confirmed"), EventStatus::Confirmed);
        assert_eq!(EventStatus::parse("tentative"), EventStatus::Tentative);
        assert_eq!(EventStatus::parse("cancelled"), EventStatus::Cancelled);
        assert_eq!(EventStatus::parse(""), EventStatus::Confirmed);
        assert_eq!(EventStatus::parse("something-new"), EventStatus::Confirmed);
    }

    #[test]
    fn test_remote_event_deserializes_sparse_cancelled_record() {
        // Incremental feeds report deletions as bare cancelled records.
        let json = r#"{"id": "abc123", "status": "cancelled", "etag": "\"3181161784712000\""}"#;
        let event: RemoteEvent = serde_json::from_str(json).expect("should deserialize");

        assert_eq!(event.id, "abc123");
        assert_eq!(EventStatus::parse(&event.status), EventStatus::Cancelled);
        assert!(event.start.is_none());
        assert!(event.summary.is_empty());
    }

    #[test]
    fn test_remote_event_time_prefers_camel_case_keys() {
        let json = r#"{"dateTime": "2024-03-01T09:00:00+01:00"}"#;
        let time: RemoteEventTime = serde_json::from_str(json).expect("should deserialize");
        assert!(time.date.is_none());
        assert_eq!(time.date_time.as_deref(), Some("2024-03-01T09:00:00+01:00"));
    }
}

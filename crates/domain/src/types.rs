//! Domain types for the event catalog.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an event.
///
/// A closed enumeration: unrecognized provider values are coerced to
/// [`EventStatus::Open`] at the validation boundary and never stored as
/// free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Open,
    Closed,
}

impl EventStatus {
    /// Stable string form used on the wire and in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Open => "open",
            EventStatus::Closed => "closed",
        }
    }

    /// Parse a status string; returns `None` for anything but the two
    /// known values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(EventStatus::Open),
            "closed" => Some(EventStatus::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A venue hosting events.
///
/// Identity is the provider-supplied id, stable across syncs. Venues are
/// created on first sight and never updated or deleted by the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    pub id: Uuid,
    pub name: String,
}

/// A catalog event.
///
/// Invariants (enforced at validation): `name` is non-empty and at most
/// 255 characters; `status` is one of the two enum variants. `venue_id`
/// is absent when the provider sent no venue or a malformed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub event_time: DateTime<Utc>,
    pub status: EventStatus,
    pub venue_id: Option<Uuid>,
}

/// Event joined with its venue, as served by the read endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: Uuid,
    pub name: String,
    pub event_time: DateTime<Utc>,
    pub status: EventStatus,
    pub venue: Option<Venue>,
}

/// Immutable audit row written once per successful non-dry-run sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    pub id: i64,
    pub sync_date: NaiveDate,
    pub new_events_count: u32,
    pub updated_events_count: u32,
}

/// A registered user of the catalog API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
}

/// Sort order for event listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventOrdering {
    #[default]
    EventTimeAsc,
    EventTimeDesc,
}

/// Filter parameters for the event listing endpoint.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub status: Option<EventStatus>,
    pub venue_id: Option<Uuid>,
    pub venue_name: Option<String>,
    /// Case-insensitive substring match against event name or venue name.
    pub search: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub ordering: EventOrdering,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_known_values_only() {
        assert_eq!(EventStatus::parse("open"), Some(EventStatus::Open));
        assert_eq!(EventStatus::parse("closed"), Some(EventStatus::Closed));
        assert_eq!(EventStatus::parse("cancelled"), None);
        assert_eq!(EventStatus::parse("OPEN"), None);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&EventStatus::Closed).unwrap();
        assert_eq!(json, "\"closed\"");
    }
}

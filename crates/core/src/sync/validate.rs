//! Field-by-field validation of raw provider records.
//!
//! Provider data is untrusted: every record is checked before it reaches
//! the reconciler. A record that fails a rule is skipped and counted,
//! never aborting the run. An unrecognized status is coerced to the
//! default rather than rejected, matching the provider's loose contract.

use chrono::{DateTime, Utc};
use marquee_domain::EventStatus;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

/// Maximum accepted event name length, in characters.
pub const MAX_NAME_CHARS: usize = 255;

/// A provider record that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidEvent {
    pub id: Uuid,
    pub name: String,
    pub event_time: DateTime<Utc>,
    pub status: EventStatus,
    pub venue: Option<VenueRef>,
}

/// Venue reference carried by a validated record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueRef {
    pub id: Uuid,
    pub name: String,
}

/// Result of validating one raw batch.
#[derive(Debug, Default)]
pub struct ValidationOutcome {
    /// Accepted records, in input order
    pub accepted: Vec<ValidEvent>,
    /// Records rejected by a validation rule
    pub skipped: usize,
}

/// Validate raw records, keeping input order for accepted ones.
///
/// When `limit` is given, only the first `limit` raw records are
/// considered at all.
pub fn validate_records(records: &[Value], limit: Option<usize>) -> ValidationOutcome {
    let considered = match limit {
        Some(n) => &records[..records.len().min(n)],
        None => records,
    };

    let mut outcome = ValidationOutcome::default();

    for record in considered {
        match validate_record(record) {
            Ok(event) => outcome.accepted.push(event),
            Err(reason) => {
                debug!(reason, record = %record, "skipping invalid provider record");
                outcome.skipped += 1;
            }
        }
    }

    outcome
}

/// Apply the per-record rules in order; the first failing rule rejects.
fn validate_record(record: &Value) -> std::result::Result<ValidEvent, &'static str> {
    let fields = record.as_object().ok_or("record is not an object")?;

    let id = fields
        .get("id")
        .and_then(Value::as_str)
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or("id is missing or not a well-formed UUID")?;

    let name = fields
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .ok_or("name is missing or empty")?;
    if name.chars().count() > MAX_NAME_CHARS {
        return Err("name exceeds 255 characters");
    }

    let event_time = fields
        .get("event_time")
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
        .ok_or("event_time is missing or not a valid date-time")?;

    let status = parse_status(fields.get("status"), id);
    let venue = parse_venue(fields.get("venue"), id);

    Ok(ValidEvent { id, name: name.to_string(), event_time, status, venue })
}

/// Missing status defaults to open; an unrecognized value is coerced to
/// open with a warning. Never a rejection.
fn parse_status(value: Option<&Value>, event_id: Uuid) -> EventStatus {
    match value {
        None | Some(Value::Null) => EventStatus::default(),
        Some(raw) => {
            let parsed = raw.as_str().and_then(EventStatus::parse);
            match parsed {
                Some(status) => status,
                None => {
                    warn!(%event_id, status = %raw, "unrecognized event status, coercing to open");
                    EventStatus::default()
                }
            }
        }
    }
}

/// A venue must be an object with a non-null UUID `id`; anything else
/// yields an event with no venue reference (not a rejection).
fn parse_venue(value: Option<&Value>, event_id: Uuid) -> Option<VenueRef> {
    let venue = match value {
        None | Some(Value::Null) => return None,
        Some(v) => v,
    };

    let fields = match venue.as_object() {
        Some(fields) => fields,
        None => {
            warn!(%event_id, "venue is not an object, dropping venue reference");
            return None;
        }
    };

    let id = fields.get("id").and_then(Value::as_str).and_then(|raw| Uuid::parse_str(raw).ok());
    match id {
        Some(id) => {
            let name = fields.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
            Some(VenueRef { id, name })
        }
        None => {
            warn!(%event_id, "venue id is missing or malformed, dropping venue reference");
            None
        }
    }
}

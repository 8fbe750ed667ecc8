//! Reconciliation planner.
//!
//! Pure computation: given validated provider records and the currently
//! persisted venues/events for the referenced identifiers, compute the
//! minimal set of venue inserts, event inserts and event updates. The
//! caller owns loading state and applying the plan, so the same plan is
//! produced whether or not the run is a dry run.

use std::collections::{HashMap, HashSet};

use marquee_domain::{Event, Venue};
use uuid::Uuid;

use super::validate::ValidEvent;

/// Staged writes produced by [`plan`].
#[derive(Debug, Default)]
pub struct ReconcilePlan {
    pub new_venues: Vec<Venue>,
    pub new_events: Vec<Event>,
    pub updated_events: Vec<Event>,
}

/// Distinct venue and event identifiers referenced by a validated batch,
/// used for the bulk lookups that feed [`plan`].
pub fn referenced_ids(records: &[ValidEvent]) -> (Vec<Uuid>, Vec<Uuid>) {
    let mut venue_ids: Vec<Uuid> = Vec::new();
    let mut seen_venues: HashSet<Uuid> = HashSet::new();
    let mut event_ids: Vec<Uuid> = Vec::new();
    let mut seen_events: HashSet<Uuid> = HashSet::new();

    for record in records {
        if seen_events.insert(record.id) {
            event_ids.push(record.id);
        }
        if let Some(venue) = &record.venue {
            if seen_venues.insert(venue.id) {
                venue_ids.push(venue.id);
            }
        }
    }

    (venue_ids, event_ids)
}

/// Compute the reconciliation plan for one validated batch.
///
/// - Venues unseen in the store are staged once per id (first occurrence
///   wins) before event diffing, so a venue discovered earlier in the
///   batch resolves as existing for later events.
/// - An event already in the store is staged as an update only when one
///   of {name, event_time, status, venue reference} differs.
/// - Duplicate event ids within the batch: the later record overwrites
///   the staged entity.
pub fn plan(
    records: &[ValidEvent],
    existing_venues: &HashMap<Uuid, Venue>,
    existing_events: &HashMap<Uuid, Event>,
) -> ReconcilePlan {
    let mut new_venues: Vec<Venue> = Vec::new();
    let mut staged_venue_ids: HashSet<Uuid> = HashSet::new();

    for record in records {
        let Some(venue) = &record.venue else { continue };
        if existing_venues.contains_key(&venue.id) || !staged_venue_ids.insert(venue.id) {
            continue;
        }
        new_venues.push(Venue { id: venue.id, name: venue.name.clone() });
    }

    // Later records with the same id overwrite earlier staged entities;
    // index maps keep the output order stable at first occurrence.
    let mut new_events: Vec<Event> = Vec::new();
    let mut new_index: HashMap<Uuid, usize> = HashMap::new();
    let mut updated_events: Vec<Event> = Vec::new();
    let mut updated_index: HashMap<Uuid, usize> = HashMap::new();

    for record in records {
        let venue_id = record.venue.as_ref().map(|v| v.id);

        if let Some(existing) = existing_events.get(&record.id) {
            match diff_event(existing, record, venue_id) {
                Some(updated) => {
                    if let Some(&slot) = updated_index.get(&record.id) {
                        updated_events[slot] = updated;
                    } else {
                        updated_index.insert(record.id, updated_events.len());
                        updated_events.push(updated);
                    }
                }
                None => {
                    // An earlier duplicate may have staged a change the
                    // later identical record retracts.
                    if let Some(slot) = updated_index.remove(&record.id) {
                        updated_events.remove(slot);
                        for index in updated_index.values_mut() {
                            if *index > slot {
                                *index -= 1;
                            }
                        }
                    }
                }
            }
        } else {
            let staged = Event {
                id: record.id,
                name: record.name.clone(),
                event_time: record.event_time,
                status: record.status,
                venue_id,
            };
            if let Some(&slot) = new_index.get(&record.id) {
                new_events[slot] = staged;
            } else {
                new_index.insert(record.id, new_events.len());
                new_events.push(staged);
            }
        }
    }

    ReconcilePlan { new_venues, new_events, updated_events }
}

/// Explicit four-field diff: {name, event_time, status, venue reference}.
///
/// Returns the updated event when any field differs; `None` leaves the
/// stored event untouched. The venue comparison is by resolved venue id,
/// not by the raw payload.
fn diff_event(existing: &Event, incoming: &ValidEvent, venue_id: Option<Uuid>) -> Option<Event> {
    let changed = existing.name != incoming.name
        || existing.event_time != incoming.event_time
        || existing.status != incoming.status
        || existing.venue_id != venue_id;

    changed.then(|| Event {
        id: existing.id,
        name: incoming.name.clone(),
        event_time: incoming.event_time,
        status: incoming.status,
        venue_id,
    })
}

//! Port interfaces for catalog persistence
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_domain::{Event, EventFilter, EventSummary, Result, SyncResult, Venue};
use uuid::Uuid;

/// Trait for persisting venues
#[async_trait]
pub trait VenueRepository: Send + Sync {
    /// Bulk-load venues matching the given identifiers (single query)
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Venue>>;

    /// Insert a batch of venues inside one atomic transaction
    async fn insert_batch(&self, venues: &[Venue]) -> Result<()>;
}

/// Trait for persisting events
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Bulk-load events matching the given identifiers (single query)
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Event>>;

    /// Insert a batch of events inside one atomic transaction
    async fn insert_batch(&self, events: &[Event]) -> Result<()>;

    /// Update a batch of events inside one atomic transaction.
    ///
    /// Only the four mutable fields are written: name, event time,
    /// status and venue reference.
    async fn update_batch(&self, events: &[Event]) -> Result<()>;

    /// List events with their venues, filtered and ordered
    async fn list(&self, filter: &EventFilter) -> Result<Vec<EventSummary>>;

    /// Count events whose event time is older than `cutoff`
    async fn count_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    /// Delete events whose event time is older than `cutoff`, at most
    /// `limit` rows per call; returns the number of rows deleted
    async fn delete_before(&self, cutoff: DateTime<Utc>, limit: usize) -> Result<usize>;
}

/// Trait for recording sync audit rows
#[async_trait]
pub trait SyncResultRepository: Send + Sync {
    /// Append one audit row for a completed sync run
    async fn record(&self, new_events_count: u32, updated_events_count: u32) -> Result<()>;

    /// Most recent audit rows, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<SyncResult>>;
}

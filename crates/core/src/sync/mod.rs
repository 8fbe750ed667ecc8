//! Event sync engine
//!
//! Orchestrates one reconciliation run against the external events
//! provider: fetch raw records (paginated), validate them field by
//! field, diff against persisted state, and apply the staged writes in
//! fixed-size atomic chunks. A dry run performs every computation but
//! skips persistence entirely.

pub mod ports;
pub mod reconcile;
pub mod validate;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use marquee_domain::{Event, Result, Venue};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::catalog::ports::{EventRepository, SyncResultRepository, VenueRepository};
use self::ports::{EventFeed, FeedBatch};
use self::reconcile::ReconcilePlan;

/// Parameters for one sync invocation.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Sync records changed on this date; `None` means yesterday.
    /// Ignored when `all` is set.
    pub date: Option<NaiveDate>,
    /// Fetch the full catalog instead of a single changed-at date
    pub all: bool,
    /// Entities persisted per atomic chunk
    pub batch_size: usize,
    /// Compute everything, write nothing
    pub dry_run: bool,
    /// Consider only the first N raw records
    pub limit: Option<usize>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { date: None, all: false, batch_size: 500, dry_run: false, limit: None }
    }
}

/// Outcome of one sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Raw records received from the provider
    pub received: usize,
    /// Records rejected by validation
    pub skipped: usize,
    /// Events created (or that would be, under dry run)
    pub new_events: usize,
    /// Events updated (or that would be, under dry run)
    pub updated_events: usize,
    /// Venues created (or that would be, under dry run)
    pub new_venues: usize,
    /// Pages fetched from the provider
    pub pages: usize,
    /// False when pagination stopped early and the run processed a
    /// partial record set
    pub feed_complete: bool,
    pub dry_run: bool,
}

/// Event sync engine.
///
/// Single-threaded and run-to-completion per invocation; concurrent
/// invocations are the scheduler's problem, not guarded here.
pub struct SyncService {
    feed: Arc<dyn EventFeed>,
    venues: Arc<dyn VenueRepository>,
    events: Arc<dyn EventRepository>,
    results: Arc<dyn SyncResultRepository>,
}

impl SyncService {
    /// Create a new sync engine over the given feed and repositories.
    pub fn new(
        feed: Arc<dyn EventFeed>,
        venues: Arc<dyn VenueRepository>,
        events: Arc<dyn EventRepository>,
        results: Arc<dyn SyncResultRepository>,
    ) -> Self {
        Self { feed, venues, events, results }
    }

    /// Perform one sync run.
    ///
    /// 1. Fetch raw records from the provider (single date page or the
    ///    full paginated catalog)
    /// 2. Validate and normalize each record
    /// 3. Bulk-load referenced venues/events and compute the plan
    /// 4. Apply staged writes in `batch_size` chunks (skipped on dry run)
    /// 5. Record the audit row
    #[instrument(skip(self), fields(all = options.all, dry_run = options.dry_run))]
    pub async fn run(&self, options: SyncOptions) -> Result<SyncReport> {
        let batch = if options.all {
            info!("starting full event sync");
            self.feed.fetch_all().await?
        } else {
            let date =
                options.date.unwrap_or_else(|| (Utc::now() - Duration::days(1)).date_naive());
            info!(%date, "starting incremental event sync");
            self.feed.fetch_since(date).await?
        };

        let FeedBatch { records, pages, complete } = batch;
        if !complete {
            warn!(
                received = records.len(),
                pages, "provider feed ended early, reconciling partial record set"
            );
        }

        let received = records.len();
        let outcome = validate::validate_records(&records, options.limit);
        if outcome.skipped > 0 {
            warn!(skipped = outcome.skipped, "skipped invalid provider records");
        }

        let (venue_ids, event_ids) = reconcile::referenced_ids(&outcome.accepted);
        let existing_venues = index_venues(self.venues.find_by_ids(&venue_ids).await?);
        let existing_events = index_events(self.events.find_by_ids(&event_ids).await?);

        let plan = reconcile::plan(&outcome.accepted, &existing_venues, &existing_events);

        let report = SyncReport {
            received,
            skipped: outcome.skipped,
            new_events: plan.new_events.len(),
            updated_events: plan.updated_events.len(),
            new_venues: plan.new_venues.len(),
            pages,
            feed_complete: complete,
            dry_run: options.dry_run,
        };

        if options.dry_run {
            info!(
                new_events = report.new_events,
                updated_events = report.updated_events,
                new_venues = report.new_venues,
                "dry run complete, no writes performed"
            );
            return Ok(report);
        }

        self.apply(&plan, options.batch_size).await?;

        self.results
            .record(report.new_events as u32, report.updated_events as u32)
            .await?;

        info!(
            received = report.received,
            skipped = report.skipped,
            new_events = report.new_events,
            updated_events = report.updated_events,
            "sync finished"
        );

        Ok(report)
    }

    /// Persist the staged sets in fixed-size chunks, each chunk one
    /// atomic transaction. Venue inserts go first so event venue
    /// references are satisfiable; a failed chunk aborts the rest while
    /// earlier chunks stay committed.
    async fn apply(&self, plan: &ReconcilePlan, batch_size: usize) -> Result<()> {
        let batch_size = batch_size.max(1);

        for chunk in plan.new_venues.chunks(batch_size) {
            self.venues.insert_batch(chunk).await?;
        }
        for chunk in plan.new_events.chunks(batch_size) {
            self.events.insert_batch(chunk).await?;
        }
        for chunk in plan.updated_events.chunks(batch_size) {
            self.events.update_batch(chunk).await?;
        }

        Ok(())
    }
}

fn index_venues(venues: Vec<Venue>) -> HashMap<Uuid, Venue> {
    venues.into_iter().map(|venue| (venue.id, venue)).collect()
}

fn index_events(events: Vec<Event>) -> HashMap<Uuid, Event> {
    events.into_iter().map(|event| (event.id, event)).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use marquee_domain::{EventFilter, EventStatus, EventSummary, MarqueeError, SyncResult};
    use serde_json::{json, Value};

    use super::*;

    /// In-memory store shared by the mock repositories.
    #[derive(Default)]
    struct MemoryStore {
        venues: Mutex<Vec<Venue>>,
        events: Mutex<Vec<Event>>,
        results: Mutex<Vec<(u32, u32)>>,
        insert_calls: Mutex<usize>,
        update_calls: Mutex<usize>,
    }

    struct StoreHandle(Arc<MemoryStore>);

    #[async_trait]
    impl VenueRepository for StoreHandle {
        async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Venue>> {
            let venues = self.0.venues.lock().unwrap();
            Ok(venues.iter().filter(|v| ids.contains(&v.id)).cloned().collect())
        }

        async fn insert_batch(&self, venues: &[Venue]) -> Result<()> {
            self.0.venues.lock().unwrap().extend_from_slice(venues);
            Ok(())
        }
    }

    #[async_trait]
    impl EventRepository for StoreHandle {
        async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Event>> {
            let events = self.0.events.lock().unwrap();
            Ok(events.iter().filter(|e| ids.contains(&e.id)).cloned().collect())
        }

        async fn insert_batch(&self, events: &[Event]) -> Result<()> {
            *self.0.insert_calls.lock().unwrap() += 1;
            self.0.events.lock().unwrap().extend_from_slice(events);
            Ok(())
        }

        async fn update_batch(&self, events: &[Event]) -> Result<()> {
            *self.0.update_calls.lock().unwrap() += 1;
            let mut stored = self.0.events.lock().unwrap();
            for incoming in events {
                if let Some(slot) = stored.iter_mut().find(|e| e.id == incoming.id) {
                    *slot = incoming.clone();
                }
            }
            Ok(())
        }

        async fn list(&self, _filter: &EventFilter) -> Result<Vec<EventSummary>> {
            Err(MarqueeError::Internal("not used in these tests".into()))
        }

        async fn count_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
            let events = self.0.events.lock().unwrap();
            Ok(events.iter().filter(|e| e.event_time < cutoff).count())
        }

        async fn delete_before(&self, cutoff: DateTime<Utc>, _limit: usize) -> Result<usize> {
            let mut events = self.0.events.lock().unwrap();
            let before = events.len();
            events.retain(|e| e.event_time >= cutoff);
            Ok(before - events.len())
        }
    }

    #[async_trait]
    impl SyncResultRepository for StoreHandle {
        async fn record(&self, new_events_count: u32, updated_events_count: u32) -> Result<()> {
            self.0.results.lock().unwrap().push((new_events_count, updated_events_count));
            Ok(())
        }

        async fn recent(&self, _limit: usize) -> Result<Vec<SyncResult>> {
            Ok(Vec::new())
        }
    }

    struct StaticFeed {
        records: Vec<Value>,
    }

    #[async_trait]
    impl EventFeed for StaticFeed {
        async fn fetch_since(&self, _changed_at: NaiveDate) -> Result<FeedBatch> {
            Ok(FeedBatch { records: self.records.clone(), pages: 1, complete: true })
        }

        async fn fetch_all(&self) -> Result<FeedBatch> {
            Ok(FeedBatch { records: self.records.clone(), pages: 1, complete: true })
        }
    }

    fn service(store: &Arc<MemoryStore>, records: Vec<Value>) -> SyncService {
        SyncService::new(
            Arc::new(StaticFeed { records }),
            Arc::new(StoreHandle(Arc::clone(store))),
            Arc::new(StoreHandle(Arc::clone(store))),
            Arc::new(StoreHandle(Arc::clone(store))),
        )
    }

    fn concert_record() -> Value {
        json!({
            "id": "11111111-1111-1111-1111-111111111111",
            "name": "Concert",
            "event_time": "2024-06-01T20:00:00Z",
            "status": "open",
            "venue": null,
        })
    }

    #[tokio::test]
    async fn new_record_against_empty_store_creates_one_event() {
        let store = Arc::new(MemoryStore::default());
        let engine = service(&store, vec![concert_record()]);

        let report = engine.run(SyncOptions::default()).await.unwrap();

        assert_eq!(report.received, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.new_events, 1);
        assert_eq!(report.new_venues, 0);
        assert_eq!(report.updated_events, 0);
        assert_eq!(store.events.lock().unwrap().len(), 1);
        assert_eq!(*store.results.lock().unwrap(), vec![(1, 0)]);
    }

    #[tokio::test]
    async fn resync_with_renamed_record_updates_in_place() {
        let store = Arc::new(MemoryStore::default());
        service(&store, vec![concert_record()])
            .run(SyncOptions::default())
            .await
            .unwrap();

        let mut renamed = concert_record();
        renamed["name"] = json!("Concert Revised");
        let report =
            service(&store, vec![renamed]).run(SyncOptions::default()).await.unwrap();

        assert_eq!(report.new_events, 0);
        assert_eq!(report.updated_events, 1);
        let events = store.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Concert Revised");
    }

    #[tokio::test]
    async fn second_identical_run_is_idempotent() {
        let store = Arc::new(MemoryStore::default());
        service(&store, vec![concert_record()])
            .run(SyncOptions::default())
            .await
            .unwrap();

        let report = service(&store, vec![concert_record()])
            .run(SyncOptions::default())
            .await
            .unwrap();

        assert_eq!(report.new_events, 0);
        assert_eq!(report.updated_events, 0);
        assert_eq!(report.new_venues, 0);
    }

    #[tokio::test]
    async fn dry_run_reports_counts_but_writes_nothing() {
        let store = Arc::new(MemoryStore::default());
        let engine = service(&store, vec![concert_record()]);

        let dry = engine
            .run(SyncOptions { dry_run: true, ..SyncOptions::default() })
            .await
            .unwrap();
        let wet = engine.run(SyncOptions::default()).await.unwrap();

        // Identical computed counts either way.
        assert_eq!(dry.new_events, wet.new_events);
        assert_eq!(dry.updated_events, wet.updated_events);
        // But the dry run left the store untouched and recorded no audit row.
        assert_eq!(store.events.lock().unwrap().len(), 1);
        assert_eq!(store.results.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_records_are_skipped_not_fatal() {
        let store = Arc::new(MemoryStore::default());
        let bad = json!({"id": "nope", "name": "X", "event_time": "2024-06-01T20:00:00Z"});
        let engine = service(&store, vec![bad, concert_record()]);

        let report = engine.run(SyncOptions::default()).await.unwrap();

        assert_eq!(report.received, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.new_events, 1);
    }

    #[tokio::test]
    async fn apply_chunks_by_batch_size() {
        let store = Arc::new(MemoryStore::default());
        let records: Vec<Value> = (0..5)
            .map(|n| {
                json!({
                    "id": Uuid::from_bytes([n + 1; 16]).to_string(),
                    "name": format!("Event {n}"),
                    "event_time": "2024-06-01T20:00:00Z",
                })
            })
            .collect();
        let engine = service(&store, records);

        engine
            .run(SyncOptions { batch_size: 2, ..SyncOptions::default() })
            .await
            .unwrap();

        // 5 new events in chunks of 2 -> 3 insert transactions.
        assert_eq!(*store.insert_calls.lock().unwrap(), 3);
        assert_eq!(store.events.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn limit_caps_considered_records() {
        let store = Arc::new(MemoryStore::default());
        let records: Vec<Value> = (0..4)
            .map(|n| {
                json!({
                    "id": Uuid::from_bytes([n + 1; 16]).to_string(),
                    "name": format!("Event {n}"),
                    "event_time": "2024-06-01T20:00:00Z",
                })
            })
            .collect();
        let engine = service(&store, records);

        let report = engine
            .run(SyncOptions { limit: Some(2), ..SyncOptions::default() })
            .await
            .unwrap();

        assert_eq!(report.new_events, 2);
        assert_eq!(store.events.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn venue_is_created_and_referenced() {
        let store = Arc::new(MemoryStore::default());
        let mut record = concert_record();
        record["venue"] =
            json!({"id": "22222222-2222-2222-2222-222222222222", "name": "Arena"});
        let engine = service(&store, vec![record]);

        let report = engine.run(SyncOptions::default()).await.unwrap();

        assert_eq!(report.new_venues, 1);
        let events = store.events.lock().unwrap();
        assert_eq!(
            events[0].venue_id.map(|id| id.to_string()).as_deref(),
            Some("22222222-2222-2222-2222-222222222222")
        );
        assert_eq!(events[0].status, EventStatus::Open);
    }
}

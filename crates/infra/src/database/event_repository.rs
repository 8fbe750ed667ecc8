//! SQLite-backed implementation of the EventRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_core::EventRepository;
use marquee_domain::{
    Event, EventFilter, EventOrdering, EventStatus, EventSummary, Result, Venue,
};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, params_from_iter, Row, ToSql};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::manager::map_sql_error;
use super::{placeholders, uuid_column};
use crate::errors::InfraError;

/// SQLite implementation of EventRepository
pub struct SqliteEventRepository {
    pool: Arc<Pool<SqliteConnectionManager>>,
}

impl SqliteEventRepository {
    pub fn new(pool: Arc<Pool<SqliteConnectionManager>>) -> Self {
        Self { pool }
    }
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let secs: i64 = row.get(idx)?;
    DateTime::from_timestamp(secs, 0)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, secs))
}

fn status_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<EventStatus> {
    let text: String = row.get(idx)?;
    EventStatus::parse(&text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown event status: {text}").into(),
        )
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    let venue_id: Option<String> = row.get(4)?;
    let venue_id = match venue_id {
        Some(text) => Some(Uuid::parse_str(&text).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                Box::new(err),
            )
        })?),
        None => None,
    };

    Ok(Event {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        event_time: timestamp_column(row, 2)?,
        status: status_column(row, 3)?,
        venue_id,
    })
}

#[async_trait]
impl EventRepository for SqliteEventRepository {
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Event>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.pool.get().map_err(InfraError::from)?;
        let sql = format!(
            "SELECT id, name, event_time, status, venue_id FROM events WHERE id IN ({})",
            placeholders(ids.len())
        );

        let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
        let rows = stmt
            .query_map(params_from_iter(ids.iter().map(ToString::to_string)), event_from_row)
            .map_err(map_sql_error)?;

        let events = rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)?;
        debug!(requested = ids.len(), found = events.len(), "loaded events by id");
        Ok(events)
    }

    #[instrument(skip(self, events), fields(count = events.len()))]
    async fn insert_batch(&self, events: &[Event]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let mut conn = self.pool.get().map_err(InfraError::from)?;
        let tx = conn.transaction().map_err(map_sql_error)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO events (id, name, event_time, status, venue_id)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(map_sql_error)?;
            for event in events {
                stmt.execute(params![
                    event.id.to_string(),
                    event.name,
                    event.event_time.timestamp(),
                    event.status.as_str(),
                    event.venue_id.map(|id| id.to_string()),
                ])
                .map_err(map_sql_error)?;
            }
        }
        tx.commit().map_err(map_sql_error)?;

        debug!(count = events.len(), "inserted event batch");
        Ok(())
    }

    #[instrument(skip(self, events), fields(count = events.len()))]
    async fn update_batch(&self, events: &[Event]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let mut conn = self.pool.get().map_err(InfraError::from)?;
        let tx = conn.transaction().map_err(map_sql_error)?;
        {
            let mut stmt = tx
                .prepare(
                    "UPDATE events
                     SET name = ?2, event_time = ?3, status = ?4, venue_id = ?5
                     WHERE id = ?1",
                )
                .map_err(map_sql_error)?;
            for event in events {
                stmt.execute(params![
                    event.id.to_string(),
                    event.name,
                    event.event_time.timestamp(),
                    event.status.as_str(),
                    event.venue_id.map(|id| id.to_string()),
                ])
                .map_err(map_sql_error)?;
            }
        }
        tx.commit().map_err(map_sql_error)?;

        debug!(count = events.len(), "updated event batch");
        Ok(())
    }

    #[instrument(skip(self, filter))]
    async fn list(&self, filter: &EventFilter) -> Result<Vec<EventSummary>> {
        let conn = self.pool.get().map_err(InfraError::from)?;

        let mut sql = String::from(
            "SELECT e.id, e.name, e.event_time, e.status, v.id, v.name
             FROM events e
             LEFT JOIN venues v ON v.id = e.venue_id",
        );
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            clauses.push("e.status = ?");
            values.push(Box::new(status.as_str().to_string()));
        }
        if let Some(venue_id) = filter.venue_id {
            clauses.push("e.venue_id = ?");
            values.push(Box::new(venue_id.to_string()));
        }
        if let Some(venue_name) = &filter.venue_name {
            clauses.push("v.name = ? COLLATE NOCASE");
            values.push(Box::new(venue_name.clone()));
        }
        if let Some(search) = &filter.search {
            clauses.push("(e.name LIKE ? OR v.name LIKE ?)");
            let pattern = format!("%{search}%");
            values.push(Box::new(pattern.clone()));
            values.push(Box::new(pattern));
        }
        if let Some(from) = filter.from {
            clauses.push("e.event_time >= ?");
            values.push(Box::new(from.timestamp()));
        }
        if let Some(until) = filter.until {
            clauses.push("e.event_time <= ?");
            values.push(Box::new(until.timestamp()));
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        sql.push_str(match filter.ordering {
            EventOrdering::EventTimeAsc => " ORDER BY e.event_time ASC, e.id ASC",
            EventOrdering::EventTimeDesc => " ORDER BY e.event_time DESC, e.id ASC",
        });

        let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter().map(|value| &**value)), |row| {
                let venue = match row.get::<_, Option<String>>(4)? {
                    Some(text) => {
                        let id = Uuid::parse_str(&text).map_err(|err| {
                            rusqlite::Error::FromSqlConversionFailure(
                                4,
                                rusqlite::types::Type::Text,
                                Box::new(err),
                            )
                        })?;
                        Some(Venue { id, name: row.get(5)? })
                    }
                    None => None,
                };
                Ok(EventSummary {
                    id: uuid_column(row, 0)?,
                    name: row.get(1)?,
                    event_time: timestamp_column(row, 2)?,
                    status: status_column(row, 3)?,
                    venue,
                })
            })
            .map_err(map_sql_error)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
    }

    #[instrument(skip(self))]
    async fn count_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM events WHERE event_time < ?1",
                params![cutoff.timestamp()],
                |row| row.get(0),
            )
            .map_err(map_sql_error)?;
        Ok(count.max(0) as usize)
    }

    #[instrument(skip(self))]
    async fn delete_before(&self, cutoff: DateTime<Utc>, limit: usize) -> Result<usize> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        let deleted = conn
            .execute(
                "DELETE FROM events WHERE id IN (
                     SELECT id FROM events WHERE event_time < ?1
                     ORDER BY event_time ASC
                     LIMIT ?2
                 )",
                params![cutoff.timestamp(), limit as i64],
            )
            .map_err(map_sql_error)?;
        debug!(deleted, "deleted expired events");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use marquee_core::VenueRepository;

    use super::super::{DbManager, SqliteVenueRepository};
    use super::*;

    fn setup() -> (SqliteEventRepository, SqliteVenueRepository) {
        let manager = DbManager::new(":memory:", 1).expect("manager");
        manager.run_migrations().expect("migrations");
        (
            SqliteEventRepository::new(manager.pool().clone()),
            SqliteVenueRepository::new(manager.pool().clone()),
        )
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 20, hour, 0, 0).unwrap()
    }

    fn event(name: &str, hour: u32, status: EventStatus, venue_id: Option<Uuid>) -> Event {
        Event { id: Uuid::new_v4(), name: name.into(), event_time: at(hour), status, venue_id }
    }

    #[tokio::test]
    async fn insert_and_find_round_trips_all_fields() {
        let (events, venues) = setup();
        let venue = Venue { id: Uuid::new_v4(), name: "Velvet Room".into() };
        venues.insert_batch(std::slice::from_ref(&venue)).await.expect("venue");

        let stored = event("Jazz Night", 20, EventStatus::Closed, Some(venue.id));
        events.insert_batch(std::slice::from_ref(&stored)).await.expect("insert");

        let found = events.find_by_ids(&[stored.id]).await.expect("find");
        assert_eq!(found, vec![stored]);
    }

    #[tokio::test]
    async fn update_batch_writes_only_mutable_fields() {
        let (events, _) = setup();
        let mut stored = event("Old Name", 10, EventStatus::Open, None);
        events.insert_batch(std::slice::from_ref(&stored)).await.expect("insert");

        stored.name = "New Name".into();
        stored.event_time = at(12);
        stored.status = EventStatus::Closed;
        events.update_batch(std::slice::from_ref(&stored)).await.expect("update");

        let found = events.find_by_ids(&[stored.id]).await.expect("find");
        assert_eq!(found, vec![stored]);
    }

    #[tokio::test]
    async fn list_joins_venue_and_orders_by_event_time() {
        let (events, venues) = setup();
        let venue = Venue { id: Uuid::new_v4(), name: "Velvet Room".into() };
        venues.insert_batch(std::slice::from_ref(&venue)).await.expect("venue");

        let late = event("Late Show", 22, EventStatus::Open, Some(venue.id));
        let early = event("Matinee", 14, EventStatus::Open, None);
        events.insert_batch(&[late.clone(), early.clone()]).await.expect("insert");

        let listed = events.list(&EventFilter::default()).await.expect("list");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Matinee");
        assert!(listed[0].venue.is_none());
        assert_eq!(listed[1].venue.as_ref().map(|v| v.name.as_str()), Some("Velvet Room"));

        let filter = EventFilter { ordering: EventOrdering::EventTimeDesc, ..Default::default() };
        let listed = events.list(&filter).await.expect("list desc");
        assert_eq!(listed[0].name, "Late Show");
    }

    #[tokio::test]
    async fn list_applies_status_venue_and_search_filters() {
        let (events, venues) = setup();
        let venue = Venue { id: Uuid::new_v4(), name: "Grand Hall".into() };
        venues.insert_batch(std::slice::from_ref(&venue)).await.expect("venue");

        let open = event("Jazz Night", 18, EventStatus::Open, Some(venue.id));
        let closed = event("Sold Out Gala", 19, EventStatus::Closed, None);
        events.insert_batch(&[open.clone(), closed.clone()]).await.expect("insert");

        let filter =
            EventFilter { status: Some(EventStatus::Closed), ..Default::default() };
        let listed = events.list(&filter).await.expect("status filter");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Sold Out Gala");

        let filter = EventFilter { venue_id: Some(venue.id), ..Default::default() };
        let listed = events.list(&filter).await.expect("venue filter");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Jazz Night");

        let filter = EventFilter { venue_name: Some("grand hall".into()), ..Default::default() };
        let listed = events.list(&filter).await.expect("venue name filter");
        assert_eq!(listed.len(), 1);

        let filter = EventFilter { search: Some("jazz".into()), ..Default::default() };
        let listed = events.list(&filter).await.expect("search filter");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Jazz Night");
    }

    #[tokio::test]
    async fn list_applies_time_window() {
        let (events, _) = setup();
        events
            .insert_batch(&[
                event("A", 8, EventStatus::Open, None),
                event("B", 12, EventStatus::Open, None),
                event("C", 18, EventStatus::Open, None),
            ])
            .await
            .expect("insert");

        let filter =
            EventFilter { from: Some(at(10)), until: Some(at(12)), ..Default::default() };
        let listed = events.list(&filter).await.expect("window");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "B");
    }

    #[tokio::test]
    async fn count_and_delete_before_respect_cutoff_and_limit() {
        let (events, _) = setup();
        events
            .insert_batch(&[
                event("A", 8, EventStatus::Open, None),
                event("B", 9, EventStatus::Open, None),
                event("C", 10, EventStatus::Open, None),
                event("D", 20, EventStatus::Open, None),
            ])
            .await
            .expect("insert");

        let cutoff = at(12);
        assert_eq!(events.count_before(cutoff).await.expect("count"), 3);

        assert_eq!(events.delete_before(cutoff, 2).await.expect("delete"), 2);
        assert_eq!(events.count_before(cutoff).await.expect("count"), 1);
        assert_eq!(events.delete_before(cutoff, 100).await.expect("delete"), 1);

        let remaining = events.list(&EventFilter::default()).await.expect("list");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "D");
    }
}

//! SQLite-backed implementation of the SyncResultRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use marquee_core::SyncResultRepository;
use marquee_domain::{Result, SyncResult};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use tracing::{debug, instrument};

use super::manager::map_sql_error;
use crate::errors::InfraError;

/// SQLite implementation of SyncResultRepository
pub struct SqliteSyncResultRepository {
    pool: Arc<Pool<SqliteConnectionManager>>,
}

impl SqliteSyncResultRepository {
    pub fn new(pool: Arc<Pool<SqliteConnectionManager>>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SyncResultRepository for SqliteSyncResultRepository {
    #[instrument(skip(self))]
    async fn record(&self, new_events_count: u32, updated_events_count: u32) -> Result<()> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        let sync_date = Utc::now().date_naive().format("%Y-%m-%d").to_string();

        conn.execute(
            "INSERT INTO sync_results (sync_date, new_events_count, updated_events_count)
             VALUES (?1, ?2, ?3)",
            params![sync_date, new_events_count, updated_events_count],
        )
        .map_err(map_sql_error)?;

        debug!(sync_date, new_events_count, updated_events_count, "recorded sync result");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn recent(&self, limit: usize) -> Result<Vec<SyncResult>> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        let mut stmt = conn
            .prepare(
                "SELECT id, sync_date, new_events_count, updated_events_count
                 FROM sync_results
                 ORDER BY id DESC
                 LIMIT ?1",
            )
            .map_err(map_sql_error)?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                let date_text: String = row.get(1)?;
                let sync_date = NaiveDate::parse_from_str(&date_text, "%Y-%m-%d").map_err(|err| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Text,
                        Box::new(err),
                    )
                })?;
                Ok(SyncResult {
                    id: row.get(0)?,
                    sync_date,
                    new_events_count: row.get(2)?,
                    updated_events_count: row.get(3)?,
                })
            })
            .map_err(map_sql_error)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
    }
}

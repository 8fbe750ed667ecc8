//! SQLite-backed implementation of the VenueRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use marquee_core::VenueRepository;
use marquee_domain::{Result, Venue};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, params_from_iter};
use tracing::{debug, instrument};

use super::manager::map_sql_error;
use super::{placeholders, uuid_column};

/// SQLite implementation of VenueRepository
pub struct SqliteVenueRepository {
    pool: Arc<Pool<SqliteConnectionManager>>,
}

impl SqliteVenueRepository {
    pub fn new(pool: Arc<Pool<SqliteConnectionManager>>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VenueRepository for SqliteVenueRepository {
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_by_ids(&self, ids: &[uuid::Uuid]) -> Result<Vec<Venue>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.pool.get().map_err(crate::errors::InfraError::from)?;
        let sql = format!(
            "SELECT id, name FROM venues WHERE id IN ({})",
            placeholders(ids.len())
        );

        let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
        let rows = stmt
            .query_map(params_from_iter(ids.iter().map(ToString::to_string)), |row| {
                Ok(Venue { id: uuid_column(row, 0)?, name: row.get(1)? })
            })
            .map_err(map_sql_error)?;

        let venues = rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)?;
        debug!(requested = ids.len(), found = venues.len(), "loaded venues by id");
        Ok(venues)
    }

    #[instrument(skip(self, venues), fields(count = venues.len()))]
    async fn insert_batch(&self, venues: &[Venue]) -> Result<()> {
        if venues.is_empty() {
            return Ok(());
        }

        let mut conn = self.pool.get().map_err(crate::errors::InfraError::from)?;
        let tx = conn.transaction().map_err(map_sql_error)?;
        {
            let mut stmt = tx
                .prepare("INSERT INTO venues (id, name) VALUES (?1, ?2)")
                .map_err(map_sql_error)?;
            for venue in venues {
                stmt.execute(params![venue.id.to_string(), venue.name])
                    .map_err(map_sql_error)?;
            }
        }
        tx.commit().map_err(map_sql_error)?;

        debug!(count = venues.len(), "inserted venue batch");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::super::DbManager;
    use super::*;

    fn repository() -> SqliteVenueRepository {
        let manager = DbManager::new(":memory:", 1).expect("manager");
        manager.run_migrations().expect("migrations");
        SqliteVenueRepository::new(manager.pool().clone())
    }

    #[tokio::test]
    async fn insert_then_find_round_trips() {
        let repo = repository();
        let venue = Venue { id: Uuid::new_v4(), name: "Velvet Room".into() };

        repo.insert_batch(std::slice::from_ref(&venue)).await.expect("insert");
        let found = repo.find_by_ids(&[venue.id]).await.expect("find");

        assert_eq!(found, vec![venue]);
    }

    #[tokio::test]
    async fn find_by_ids_ignores_unknown_ids() {
        let repo = repository();
        let known = Venue { id: Uuid::new_v4(), name: "Velvet Room".into() };
        repo.insert_batch(std::slice::from_ref(&known)).await.expect("insert");

        let found = repo.find_by_ids(&[known.id, Uuid::new_v4()]).await.expect("find");
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let repo = repository();
        repo.insert_batch(&[]).await.expect("insert");
        assert!(repo.find_by_ids(&[]).await.expect("find").is_empty());
    }

    #[tokio::test]
    async fn duplicate_id_fails_the_whole_batch() {
        let repo = repository();
        let id = Uuid::new_v4();
        let first = Venue { id, name: "A".into() };
        repo.insert_batch(std::slice::from_ref(&first)).await.expect("insert");

        let other = Venue { id: Uuid::new_v4(), name: "B".into() };
        let dup = Venue { id, name: "A again".into() };
        let result = repo.insert_batch(&[other.clone(), dup]).await;

        assert!(result.is_err());
        // Atomic: the non-conflicting row must not have been written either.
        assert!(repo.find_by_ids(&[other.id]).await.expect("find").is_empty());
    }
}

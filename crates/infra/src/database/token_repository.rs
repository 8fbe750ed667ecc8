//! SQLite-backed implementation of the TokenRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_core::{TokenRecord, TokenRepository};
use marquee_domain::{MarqueeError, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row};
use tracing::instrument;

use super::manager::map_sql_error;
use super::uuid_column;
use crate::errors::InfraError;

/// SQLite implementation of TokenRepository
pub struct SqliteTokenRepository {
    pool: Arc<Pool<SqliteConnectionManager>>,
}

impl SqliteTokenRepository {
    pub fn new(pool: Arc<Pool<SqliteConnectionManager>>) -> Self {
        Self { pool }
    }
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let secs: i64 = row.get(idx)?;
    DateTime::from_timestamp(secs, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, secs))
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<TokenRecord> {
    Ok(TokenRecord {
        user_id: uuid_column(row, 0)?,
        access_token: row.get(1)?,
        refresh_token: row.get(2)?,
        access_expires_at: timestamp_column(row, 3)?,
        refresh_expires_at: timestamp_column(row, 4)?,
        revoked: row.get(5)?,
    })
}

const SELECT_COLUMNS: &str =
    "user_id, access_token, refresh_token, access_expires_at, refresh_expires_at, revoked";

#[async_trait]
impl TokenRepository for SqliteTokenRepository {
    #[instrument(skip(self, record), fields(user_id = %record.user_id))]
    async fn insert(&self, record: &TokenRecord) -> Result<()> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        conn.execute(
            "INSERT INTO auth_tokens
             (user_id, access_token, refresh_token, access_expires_at, refresh_expires_at, revoked)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.user_id.to_string(),
                record.access_token,
                record.refresh_token,
                record.access_expires_at.timestamp(),
                record.refresh_expires_at.timestamp(),
                record.revoked,
            ],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn find_by_access(&self, access_token: &str) -> Result<Option<TokenRecord>> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        conn.query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM auth_tokens WHERE access_token = ?1"),
            params![access_token],
            record_from_row,
        )
        .optional()
        .map_err(map_sql_error)
    }

    #[instrument(skip_all)]
    async fn find_by_refresh(&self, refresh_token: &str) -> Result<Option<TokenRecord>> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        conn.query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM auth_tokens WHERE refresh_token = ?1"),
            params![refresh_token],
            record_from_row,
        )
        .optional()
        .map_err(map_sql_error)
    }

    #[instrument(skip_all)]
    async fn rotate_access(
        &self,
        refresh_token: &str,
        access_token: &str,
        access_expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        let changed = conn
            .execute(
                "UPDATE auth_tokens
                 SET access_token = ?2, access_expires_at = ?3
                 WHERE refresh_token = ?1 AND revoked = 0",
                params![refresh_token, access_token, access_expires_at.timestamp()],
            )
            .map_err(map_sql_error)?;

        if changed == 0 {
            return Err(MarqueeError::NotFound("no live token pair for refresh token".into()));
        }
        Ok(())
    }

    #[instrument(skip_all)]
    async fn revoke_by_refresh(&self, refresh_token: &str) -> Result<bool> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        let changed = conn
            .execute(
                "UPDATE auth_tokens SET revoked = 1
                 WHERE refresh_token = ?1 AND revoked = 0",
                params![refresh_token],
            )
            .map_err(map_sql_error)?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use marquee_domain::User;
    use uuid::Uuid;

    use super::super::{DbManager, SqliteUserRepository};
    use super::*;
    use marquee_core::UserRepository;

    async fn setup() -> (SqliteTokenRepository, Uuid) {
        let manager = DbManager::new(":memory:", 1).expect("manager");
        manager.run_migrations().expect("migrations");

        let users = SqliteUserRepository::new(manager.pool().clone());
        let user = User { id: Uuid::new_v4(), username: "ada".into() };
        users.create(&user, "salt$digest").await.expect("user");

        (SqliteTokenRepository::new(manager.pool().clone()), user.id)
    }

    fn record(user_id: Uuid) -> TokenRecord {
        let now = Utc::now();
        TokenRecord {
            user_id,
            access_token: "access-1".into(),
            refresh_token: "refresh-1".into(),
            access_expires_at: now + Duration::hours(1),
            refresh_expires_at: now + Duration::days(14),
            revoked: false,
        }
    }

    #[tokio::test]
    async fn insert_then_find_by_both_tokens() {
        let (repo, user_id) = setup().await;
        repo.insert(&record(user_id)).await.expect("insert");

        let by_access = repo.find_by_access("access-1").await.expect("find").expect("present");
        assert_eq!(by_access.user_id, user_id);
        assert!(!by_access.revoked);

        let by_refresh = repo.find_by_refresh("refresh-1").await.expect("find").expect("present");
        assert_eq!(by_refresh.access_token, "access-1");
    }

    #[tokio::test]
    async fn rotate_access_replaces_the_access_token() {
        let (repo, user_id) = setup().await;
        repo.insert(&record(user_id)).await.expect("insert");

        let new_expiry = Utc::now() + Duration::hours(1);
        repo.rotate_access("refresh-1", "access-2", new_expiry).await.expect("rotate");

        assert!(repo.find_by_access("access-1").await.expect("find").is_none());
        let rotated = repo.find_by_access("access-2").await.expect("find").expect("present");
        assert_eq!(rotated.refresh_token, "refresh-1");
    }

    #[tokio::test]
    async fn rotate_access_fails_for_revoked_pair() {
        let (repo, user_id) = setup().await;
        repo.insert(&record(user_id)).await.expect("insert");
        assert!(repo.revoke_by_refresh("refresh-1").await.expect("revoke"));

        let result = repo.rotate_access("refresh-1", "access-2", Utc::now()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn revoke_is_idempotent_and_reports_liveness() {
        let (repo, user_id) = setup().await;
        repo.insert(&record(user_id)).await.expect("insert");

        assert!(repo.revoke_by_refresh("refresh-1").await.expect("revoke"));
        assert!(!repo.revoke_by_refresh("refresh-1").await.expect("revoke again"));
        assert!(!repo.revoke_by_refresh("unknown").await.expect("unknown"));

        let found = repo.find_by_refresh("refresh-1").await.expect("find").expect("present");
        assert!(found.revoked);
    }
}

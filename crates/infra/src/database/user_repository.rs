//! SQLite-backed implementation of the UserRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use marquee_core::{UserCredentials, UserRepository};
use marquee_domain::{Result, User};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use tracing::instrument;

use super::manager::map_sql_error;
use super::uuid_column;
use crate::errors::InfraError;

/// SQLite implementation of UserRepository
pub struct SqliteUserRepository {
    pool: Arc<Pool<SqliteConnectionManager>>,
}

impl SqliteUserRepository {
    pub fn new(pool: Arc<Pool<SqliteConnectionManager>>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    #[instrument(skip(self, user, password_hash), fields(username = %user.username))]
    async fn create(&self, user: &User, password_hash: &str) -> Result<()> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        conn.execute(
            "INSERT INTO users (id, username, password_hash) VALUES (?1, ?2, ?3)",
            params![user.id.to_string(), user.username, password_hash],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> Result<Option<UserCredentials>> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        conn.query_row(
            "SELECT id, username, password_hash FROM users WHERE username = ?1",
            params![username],
            |row| {
                Ok(UserCredentials {
                    user: User { id: uuid_column(row, 0)?, username: row.get(1)? },
                    password_hash: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(map_sql_error)
    }
}

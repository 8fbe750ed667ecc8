//! SQLite persistence layer.

mod event_repository;
mod manager;
mod sync_result_repository;
mod token_repository;
mod user_repository;
mod venue_repository;

use uuid::Uuid;

pub use event_repository::SqliteEventRepository;
pub use manager::{DbConnection, DbManager};
pub use sync_result_repository::SqliteSyncResultRepository;
pub use token_repository::SqliteTokenRepository;
pub use user_repository::SqliteUserRepository;
pub use venue_repository::SqliteVenueRepository;

/// Read a TEXT column holding a UUID.
pub(crate) fn uuid_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
    })
}

/// Build an `IN (?, ?, ...)` placeholder list for `count` parameters.
pub(crate) fn placeholders(count: usize) -> String {
    let mut out = String::with_capacity(count * 2);
    for i in 0..count {
        if i > 0 {
            out.push(',');
        }
        out.push('?');
    }
    out
}

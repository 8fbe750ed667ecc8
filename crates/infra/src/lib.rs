//! # Marquee Infra
//!
//! Infrastructure adapters for the Marquee event catalog: the retrying
//! HTTP fetcher, the provider pager client, SQLite repositories, the
//! configuration loader, and the retention cleanup service.

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod provider;
pub mod scheduling;

pub use database::{
    DbManager, SqliteEventRepository, SqliteSyncResultRepository, SqliteTokenRepository,
    SqliteUserRepository, SqliteVenueRepository,
};
pub use errors::InfraError;
pub use http::HttpClient;
pub use provider::ProviderClient;
pub use scheduling::{CleanupConfig, CleanupService, CleanupStats};

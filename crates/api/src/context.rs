//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use marquee_core::{AuthService, SyncService};
use marquee_core::{EventRepository, SyncResultRepository};
use marquee_domain::{Config, Result};
use marquee_infra::{
    CleanupConfig, CleanupService, DbManager, HttpClient, ProviderClient, SqliteEventRepository,
    SqliteSyncResultRepository, SqliteTokenRepository, SqliteUserRepository,
    SqliteVenueRepository,
};
use tracing::info;

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub events: Arc<dyn EventRepository>,
    pub results: Arc<dyn SyncResultRepository>,
    pub sync_service: Arc<SyncService>,
    pub auth_service: Arc<AuthService>,
}

impl AppContext {
    /// Wire the full dependency graph from a loaded configuration.
    pub fn new(config: Config) -> Result<Self> {
        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;
        db.health_check()?;

        let venues = Arc::new(SqliteVenueRepository::new(db.pool().clone()));
        let events: Arc<SqliteEventRepository> =
            Arc::new(SqliteEventRepository::new(db.pool().clone()));
        let results: Arc<SqliteSyncResultRepository> =
            Arc::new(SqliteSyncResultRepository::new(db.pool().clone()));
        let users = Arc::new(SqliteUserRepository::new(db.pool().clone()));
        let tokens = Arc::new(SqliteTokenRepository::new(db.pool().clone()));

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.provider.timeout_seconds))
            .max_attempts(config.provider.max_retries as usize)
            .base_backoff(Duration::from_millis(config.provider.backoff_ms))
            .build()?;
        let feed = Arc::new(ProviderClient::new(http, config.provider.base_url.clone()));

        let sync_service = Arc::new(SyncService::new(
            feed,
            venues,
            events.clone(),
            results.clone(),
        ));
        let auth_service = Arc::new(AuthService::new(users, tokens));

        info!(db_path = %config.database.path, "application context initialised");

        Ok(Self {
            config,
            db,
            events,
            results,
            sync_service,
            auth_service,
        })
    }

    /// Build a cleanup service over the shared event store, configured
    /// from the retention settings.
    pub fn cleanup_service(&self) -> CleanupService {
        CleanupService::new(self.events.clone(), CleanupConfig::from(&self.config.retention))
    }
}

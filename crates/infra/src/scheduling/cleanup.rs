//! Retention cleanup for expired events.
//!
//! Periodically purges events whose `event_time` has fallen out of the
//! retention window. Deletion is bounded per statement so a large backlog
//! never produces one oversized transaction; the pass loops until the
//! backlog is drained.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use marquee_core::EventRepository;
use marquee_domain::{MarqueeError, Result, RetentionConfig};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for the cleanup service
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// Events older than this many days are purged
    pub retention_days: u32,
    /// Interval between periodic passes
    pub interval: Duration,
    /// Max rows deleted per statement
    pub max_delete_batch: usize,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            retention_days: 7,
            interval: Duration::from_secs(3600),
            max_delete_batch: 1000,
        }
    }
}

impl From<&RetentionConfig> for CleanupConfig {
    fn from(config: &RetentionConfig) -> Self {
        Self {
            retention_days: config.retention_days,
            interval: Duration::from_secs(config.interval_seconds),
            max_delete_batch: config.max_delete_batch,
        }
    }
}

/// Outcome of one cleanup pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupStats {
    /// Events outside the retention window at the start of the pass
    pub expired: usize,
    /// Events actually deleted (zero on a dry run)
    pub deleted: usize,
    pub dry_run: bool,
}

/// Periodic retention cleanup service
pub struct CleanupService {
    events: Arc<dyn EventRepository>,
    config: CleanupConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl CleanupService {
    pub fn new(events: Arc<dyn EventRepository>, config: CleanupConfig) -> Self {
        Self {
            events,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the periodic background task.
    ///
    /// # Errors
    /// Returns an error if the service is already running.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(MarqueeError::Internal("cleanup service already running".into()));
        }

        info!(
            retention_days = self.config.retention_days,
            interval_secs = self.config.interval.as_secs(),
            "starting cleanup service"
        );

        // Fresh token so the service can be restarted after stop.
        self.cancellation_token = CancellationToken::new();

        let events = Arc::clone(&self.events);
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::cleanup_loop(events, config, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Stop the background task gracefully.
    ///
    /// # Errors
    /// Returns an error if the service is not running or the task does
    /// not finish within the join timeout.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<()> {
        if !self.is_running() {
            return Err(MarqueeError::Internal("cleanup service not running".into()));
        }

        info!("stopping cleanup service");
        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = Duration::from_secs(5);
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| MarqueeError::Internal("cleanup task did not stop in time".into()))?
                .map_err(|e| MarqueeError::Internal(format!("cleanup task panicked: {e}")))?;
        }

        info!("cleanup service stopped");
        Ok(())
    }

    /// Check whether the background task is active.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Run a single cleanup pass immediately.
    ///
    /// A dry run reports how many events would be purged without touching
    /// the store.
    #[instrument(skip(self))]
    pub async fn cleanup_once(&self, dry_run: bool) -> Result<CleanupStats> {
        run_cleanup(self.events.as_ref(), &self.config, dry_run).await
    }

    /// Count what a pass would purge without deleting anything.
    pub async fn dry_run(&self) -> Result<CleanupStats> {
        self.cleanup_once(true).await
    }

    async fn cleanup_loop(
        events: Arc<dyn EventRepository>,
        config: CleanupConfig,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("cleanup loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(config.interval) => {
                    match run_cleanup(events.as_ref(), &config, false).await {
                        Ok(stats) if stats.deleted > 0 => {
                            info!(deleted = stats.deleted, "cleanup pass purged expired events");
                        }
                        Ok(_) => debug!("cleanup pass found nothing to purge"),
                        Err(e) => error!(error = %e, "cleanup pass failed"),
                    }
                }
            }
        }
    }
}

impl Drop for CleanupService {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

async fn run_cleanup(
    events: &dyn EventRepository,
    config: &CleanupConfig,
    dry_run: bool,
) -> Result<CleanupStats> {
    let cutoff = Utc::now() - chrono::Duration::days(i64::from(config.retention_days));
    let expired = events.count_before(cutoff).await?;

    if dry_run || expired == 0 {
        return Ok(CleanupStats { expired, deleted: 0, dry_run });
    }

    let batch = config.max_delete_batch.max(1);
    let mut deleted = 0usize;
    loop {
        let removed = events.delete_before(cutoff, batch).await?;
        deleted += removed;
        if removed < batch {
            break;
        }
    }

    debug!(expired, deleted, "cleanup pass finished");
    Ok(CleanupStats { expired, deleted, dry_run })
}

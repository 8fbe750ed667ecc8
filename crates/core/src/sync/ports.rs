//! Port interfaces for the sync engine

use async_trait::async_trait;
use chrono::NaiveDate;
use marquee_domain::Result;

/// Raw records accumulated from the provider, plus fetch metadata.
#[derive(Debug, Default)]
pub struct FeedBatch {
    /// Raw event records, in provider order
    pub records: Vec<serde_json::Value>,
    /// Number of pages fetched
    pub pages: usize,
    /// False when pagination stopped early (fetch failure, malformed
    /// page or unexpected shape); `records` then holds whatever was
    /// accumulated before the stop.
    pub complete: bool,
}

/// Trait for fetching raw event records from the external provider.
///
/// Implementations own pagination and transport retries; they report
/// terminal fetch failures through [`FeedBatch::complete`] rather than
/// raising, so a sync run can proceed with partial input.
#[async_trait]
pub trait EventFeed: Send + Sync {
    /// Fetch the single page of records changed on the given date
    async fn fetch_since(&self, changed_at: NaiveDate) -> Result<FeedBatch>;

    /// Fetch every record, following pagination cursors
    async fn fetch_all(&self) -> Result<FeedBatch>;
}

//! Event catalog read endpoints.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Json;
use chrono::{DateTime, Utc};
use marquee_domain::{
    EventFilter, EventOrdering, EventStatus, EventSummary, MarqueeError, SyncResult,
};
use serde::Deserialize;
use uuid::Uuid;

use super::ApiError;
use crate::context::AppContext;

/// Query parameters accepted by the event listing.
#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    pub status: Option<String>,
    pub venue_id: Option<Uuid>,
    /// Venue name, matched case-insensitively
    pub venue_name: Option<String>,
    /// Substring match against event or venue name
    pub search: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// `event_time` (default) or `-event_time`
    pub ordering: Option<String>,
}

impl ListQuery {
    fn into_filter(self) -> Result<EventFilter, MarqueeError> {
        let status = match self.status.as_deref() {
            None => None,
            Some(raw) => Some(EventStatus::parse(raw).ok_or_else(|| {
                MarqueeError::InvalidInput(format!("unknown status filter: {raw}"))
            })?),
        };

        let ordering = match self.ordering.as_deref() {
            None | Some("event_time") => EventOrdering::EventTimeAsc,
            Some("-event_time") => EventOrdering::EventTimeDesc,
            Some(raw) => {
                return Err(MarqueeError::InvalidInput(format!("unknown ordering: {raw}")));
            }
        };

        Ok(EventFilter {
            status,
            venue_id: self.venue_id,
            venue_name: self.venue_name,
            search: self.search,
            from: self.from,
            until: self.until,
            ordering,
        })
    }
}

/// GET /api/events
pub async fn list(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<EventSummary>>, ApiError> {
    let filter = query.into_filter()?;
    let events = ctx.events.list(&filter).await?;
    Ok(Json(events))
}

#[derive(Debug, Deserialize)]
pub struct SyncResultsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

/// GET /api/sync-results
pub async fn sync_results(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<SyncResultsQuery>,
) -> Result<Json<Vec<SyncResult>>, ApiError> {
    let rows = ctx.results.recent(query.limit).await?;
    Ok(Json(rows))
}

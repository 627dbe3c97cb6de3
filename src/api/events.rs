//! Read side of the event store and lane statistics.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::event_store::{AggregateType, StoredEvent};
use crate::queue::LaneQueueStats;
use crate::server::AppState;

const DEFAULT_RECENT_LIMIT: usize = 50;
const MAX_RECENT_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

impl RecentQuery {
    fn resolved_limit(&self) -> Result<usize> {
        match self.limit {
            None => Ok(DEFAULT_RECENT_LIMIT),
            Some(limit) if (1..=MAX_RECENT_LIMIT).contains(&limit) => Ok(limit),
            Some(limit) => Err(AppError::Validation(format!(
                "limit must be between 1 and {}, got {}",
                MAX_RECENT_LIMIT, limit
            ))),
        }
    }
}

/// GET /api/v1/events/recent
pub async fn recent_events(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<StoredEvent>>> {
    let limit = query.resolved_limit()?;
    Ok(Json(state.event_store.recent(limit).await?))
}

/// GET /api/v1/aggregates/{aggregate_type}/{aggregate_id}/events
pub async fn aggregate_events(
    State(state): State<AppState>,
    Path((aggregate_type, aggregate_id)): Path<(String, String)>,
) -> Result<Json<Vec<StoredEvent>>> {
    let aggregate_type: AggregateType = aggregate_type.parse().map_err(AppError::Validation)?;
    let events = state
        .event_store
        .events_for_aggregate(aggregate_type, &aggregate_id)
        .await?;
    Ok(Json(events))
}

/// GET /api/v1/lanes
pub async fn lane_stats(State(state): State<AppState>) -> Json<LaneQueueStats> {
    Json(state.lanes.stats().await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_limit() {
        assert_eq!(RecentQuery { limit: None }.resolved_limit().unwrap(), 50);
        assert_eq!(RecentQuery { limit: Some(10) }.resolved_limit().unwrap(), 10);
        assert!(RecentQuery { limit: Some(0) }.resolved_limit().is_err());
        assert!(RecentQuery { limit: Some(501) }.resolved_limit().is_err());
    }
}

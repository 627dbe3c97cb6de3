use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;
use crate::triggers::publish_event;

use super::events::{aggregate_events, lane_stats, recent_events};
use super::health::health;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest(
            "/api/v1",
            Router::new()
                // Ingestion
                .route("/events", post(publish_event))
                // Audit
                .route("/events/recent", get(recent_events))
                .route(
                    "/aggregates/{aggregate_type}/{aggregate_id}/events",
                    get(aggregate_events),
                )
                // Delivery lanes
                .route("/lanes", get(lane_stats)),
        )
}

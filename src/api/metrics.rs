//! Prometheus metrics endpoint.

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::metrics;
use crate::server::AppState;

/// GET /metrics - Prometheus metrics endpoint
pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    update_metrics_from_state(&state).await;

    match metrics::encode_metrics() {
        Ok(output) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode Prometheus metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(axum::http::header::CONTENT_TYPE, "text/plain")],
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}

/// Refresh gauges that mirror backend state
async fn update_metrics_from_state(state: &AppState) {
    let lane_stats = state.lanes.stats().await;
    for lane in &lane_stats.lanes {
        metrics::LANE_DEPTH
            .with_label_values(&[lane.lane.as_str()])
            .set(lane.depth as i64);
    }

    match state.event_store.count().await {
        Ok(count) => metrics::STORE_RECORDS.set(count as i64),
        Err(e) => tracing::warn!(error = %e, "Failed to count event store records"),
    }
}

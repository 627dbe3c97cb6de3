use axum::{extract::State, Json};
use serde::Serialize;

use crate::dispatch::DispatchReport;
use crate::error::{AppError, Result};
use crate::event::EventEnvelope;
use crate::server::AppState;

/// Response for an accepted event
#[derive(Debug, Serialize)]
pub struct PublishEventResponse {
    pub accepted: bool,
    pub report: DispatchReport,
}

/// Dispatch one envelope posted over HTTP.
///
/// Listener failures are reported per listener in the body; the request
/// itself only fails when the envelope is invalid.
pub async fn publish_event(
    State(state): State<AppState>,
    Json(envelope): Json<EventEnvelope>,
) -> Result<Json<PublishEventResponse>> {
    if envelope.event_type().trim().is_empty() {
        return Err(AppError::Validation("event type must not be empty".to_string()));
    }

    let report = state.bus.dispatch(&envelope).await;

    tracing::info!(
        event_type = %report.event_type,
        completed = report.completed(),
        failed = report.failed(),
        "Event dispatched via HTTP"
    );

    Ok(Json(PublishEventResponse {
        accepted: true,
        report,
    }))
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::event_store::EventStoreError;
use crate::postgres::PostgresPoolError;
use crate::queue::LaneQueueError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Database error: {0}")]
    Database(#[from] PostgresPoolError),

    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("Lane queue error: {0}")]
    LaneQueue(#[from] LaneQueueError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Redis(_) => (StatusCode::SERVICE_UNAVAILABLE, "REDIS_ERROR"),
            AppError::Database(_) => (StatusCode::SERVICE_UNAVAILABLE, "DATABASE_ERROR"),
            AppError::EventStore(_) => (StatusCode::INTERNAL_SERVER_ERROR, "EVENT_STORE_ERROR"),
            AppError::LaneQueue(_) => (StatusCode::INTERNAL_SERVER_ERROR, "LANE_QUEUE_ERROR"),
        }
    }

    /// Client errors carry their message in every mode.
    fn exposes_detail(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let log_message = self.to_string();
        let client_message = if self.exposes_detail() || !is_production() {
            log_message.clone()
        } else {
            "Service temporarily unavailable".to_string()
        };

        // Always log the detailed error server-side
        tracing::error!(
            code = %code,
            status = %status.as_u16(),
            message = %log_message,
            "API error"
        );

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: client_message,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let (status, code) = AppError::Validation("limit".into()).status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "VALIDATION_ERROR");

        let (status, code) =
            AppError::EventStore(EventStoreError::Unavailable("down".into())).status_and_code();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "EVENT_STORE_ERROR");
    }

    #[test]
    fn test_into_response_status() {
        let response = AppError::Validation("limit".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::LaneQueue(LaneQueueError::Unavailable("down".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

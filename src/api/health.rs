//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::redis::{RedisHealthStats, RedisHealthStatus};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub listeners: usize,
    pub redis: RedisHealthStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postgres: Option<PostgresHealthResponse>,
    pub event_store: EventStoreHealthResponse,
    pub lanes: LaneHealthResponse,
}

#[derive(Debug, Serialize)]
pub struct PostgresHealthResponse {
    pub connected: bool,
    pub pool_size: u32,
    pub idle_connections: u32,
}

#[derive(Debug, Serialize)]
pub struct EventStoreHealthResponse {
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct LaneHealthResponse {
    pub backend: String,
    pub queued_jobs: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let redis = state.redis_health.stats();
    let redis_ok = matches!(
        redis.status,
        RedisHealthStatus::Healthy | RedisHealthStatus::Disabled
    );

    let postgres = match &state.postgres {
        Some(pool) => {
            let connected = match pool.ping().await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "PostgreSQL health check failed");
                    false
                }
            };
            Some(PostgresHealthResponse {
                connected,
                pool_size: pool.pool().size(),
                idle_connections: pool.pool().num_idle() as u32,
            })
        }
        None => None,
    };
    let postgres_ok = postgres.as_ref().map(|p| p.connected).unwrap_or(true);

    let records = match state.event_store.count().await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!(error = %e, "Event store health check failed");
            None
        }
    };
    let lane_stats = state.lanes.stats().await;

    let status = if redis_ok && postgres_ok && records.is_some() {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        listeners: state.bus.listener_count(),
        redis,
        postgres,
        event_store: EventStoreHealthResponse {
            backend: state.event_store.backend_type().to_string(),
            records,
        },
        lanes: LaneHealthResponse {
            backend: lane_stats.backend_type,
            queued_jobs: lane_stats.total_jobs,
        },
    })
}

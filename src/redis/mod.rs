//! Redis connectivity shared by the lane queue and the event trigger.
//!
//! - `ExponentialBackoff`: reconnection delays with jitter
//! - `RedisHealth`: connection status reported by `/health`

mod backoff;
mod health;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use health::{RedisHealth, RedisHealthStats, RedisHealthStatus};

use redis::aio::ConnectionManager;

/// Open a multiplexed, auto-reconnecting connection.
pub async fn connect(url: &str) -> Result<ConnectionManager, redis::RedisError> {
    let client = redis::Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;
    tracing::info!("Redis connection manager ready");
    Ok(manager)
}

/// Current time in milliseconds since epoch
pub(crate) fn current_time_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

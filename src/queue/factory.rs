//! Lane queue backend factory

use std::sync::Arc;

use redis::aio::ConnectionManager;

use crate::config::LaneSettings;

use super::backend::LaneQueueBackend;
use super::memory_backend::MemoryLaneQueue;
use super::models::LaneQueueConfig;
use super::redis_backend::RedisLaneQueue;

/// Create a lane queue backend based on configuration.
///
/// - `"redis"`: Returns a `RedisLaneQueue` if a Redis connection is provided
/// - `"memory"` (default): Returns a `MemoryLaneQueue`
///
/// # Example
///
/// ```rust,ignore
/// let lanes = create_lane_queue(&settings.lanes, Some(redis_conn.clone()));
/// ```
pub fn create_lane_queue(
    settings: &LaneSettings,
    redis: Option<ConnectionManager>,
) -> Arc<dyn LaneQueueBackend> {
    match settings.backend.as_str() {
        "redis" => {
            if let Some(connection) = redis {
                tracing::info!(
                    backend = "redis",
                    prefix = %settings.redis_prefix,
                    "Creating Redis lane queue"
                );
                let config = LaneQueueConfig {
                    redis_prefix: settings.redis_prefix.clone(),
                };
                Arc::new(RedisLaneQueue::new(config, connection))
            } else {
                tracing::warn!(
                    "Redis lane queue requested but no connection provided, falling back to memory"
                );
                Arc::new(MemoryLaneQueue::new())
            }
        }
        _ => {
            tracing::info!(backend = "memory", "Creating memory lane queue");
            Arc::new(MemoryLaneQueue::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_is_default() {
        let settings = LaneSettings::default();
        assert_eq!(create_lane_queue(&settings, None).backend_type(), "memory");
    }

    #[test]
    fn test_redis_without_connection_falls_back() {
        let settings = LaneSettings {
            backend: "redis".to_string(),
            ..LaneSettings::default()
        };
        assert_eq!(create_lane_queue(&settings, None).backend_type(), "memory");
    }
}

//! Redis-based lane queue backend using Redis lists.
//!
//! Each lane is a list `{prefix}:{lane}`; jobs are RPUSHed as JSON and
//! transport workers LPOP them, which keeps per-lane FIFO order.

use async_trait::async_trait;
use dashmap::DashSet;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::metrics::LANE_ENQUEUED_TOTAL;

use super::backend::{LaneQueueBackend, LaneQueueError};
use super::{LaneDepth, LaneJob, LaneQueueConfig, LaneQueueStats, QueueLane};

/// Redis-based lane queue backend.
pub struct RedisLaneQueue {
    /// Multiplexed connection with automatic reconnect
    connection: ConnectionManager,

    /// Key prefix for Redis keys
    prefix: String,

    /// Lanes this process has written to, for stats
    known_lanes: DashSet<String>,
}

impl RedisLaneQueue {
    pub fn new(config: LaneQueueConfig, connection: ConnectionManager) -> Self {
        Self {
            connection,
            prefix: config.redis_prefix,
            known_lanes: DashSet::new(),
        }
    }

    /// Generate the Redis key for a lane.
    fn lane_key(&self, lane: &str) -> String {
        format!("{}:{}", self.prefix, lane)
    }
}

#[async_trait]
impl LaneQueueBackend for RedisLaneQueue {
    fn backend_type(&self) -> &'static str {
        "redis"
    }

    async fn enqueue(&self, job: LaneJob) -> Result<(), LaneQueueError> {
        let key = self.lane_key(job.lane.as_str());
        let payload = serde_json::to_string(&job)?;

        let mut conn = self.connection.clone();
        let depth: usize = conn.rpush(&key, payload).await?;

        self.known_lanes.insert(job.lane.as_str().to_string());
        LANE_ENQUEUED_TOTAL.with_label_values(&[job.lane.as_str()]).inc();

        tracing::debug!(
            lane = %job.lane,
            job_id = %job.id,
            key = %key,
            depth = depth,
            "Job pushed to Redis lane"
        );

        Ok(())
    }

    async fn pop(&self, lane: &QueueLane) -> Result<Option<LaneJob>, LaneQueueError> {
        let key = self.lane_key(lane.as_str());
        let mut conn = self.connection.clone();

        let raw: Option<String> = redis::cmd("LPOP").arg(&key).query_async(&mut conn).await?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn depth(&self, lane: &QueueLane) -> Result<usize, LaneQueueError> {
        let key = self.lane_key(lane.as_str());
        let mut conn = self.connection.clone();
        let depth: usize = conn.llen(&key).await?;
        Ok(depth)
    }

    async fn stats(&self) -> LaneQueueStats {
        let mut lanes = Vec::new();
        let known: Vec<String> = self.known_lanes.iter().map(|l| l.key().clone()).collect();

        for lane in known {
            match self.depth(&QueueLane::new(lane.clone())).await {
                Ok(depth) => lanes.push(LaneDepth { lane, depth }),
                Err(e) => {
                    tracing::warn!(lane = %lane, error = %e, "Failed to read Redis lane depth");
                }
            }
        }
        lanes.sort_by(|a, b| a.lane.cmp(&b.lane));

        LaneQueueStats {
            backend_type: "redis".to_string(),
            total_jobs: lanes.iter().map(|l| l.depth).sum(),
            lanes,
        }
    }
}

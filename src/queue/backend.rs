//! Backend trait for lane queue storage.
//!
//! The lane queue is the hand-off point to the external notification
//! transport: this crate pushes jobs, workers elsewhere pop and deliver them.

use async_trait::async_trait;
use thiserror::Error;

use super::{LaneJob, LaneQueueStats, QueueLane};

/// Errors that can occur during lane queue operations.
#[derive(Debug, Error)]
pub enum LaneQueueError {
    /// Redis operation failed
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend is temporarily unavailable
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Backend trait for lane queues.
///
/// # Thread Safety
///
/// Implementations are shared across tasks and must be `Send + Sync`.
#[async_trait]
pub trait LaneQueueBackend: Send + Sync {
    /// Backend type identifier, e.g. `"memory"`.
    fn backend_type(&self) -> &'static str;

    /// Append a job to the tail of its lane.
    async fn enqueue(&self, job: LaneJob) -> Result<(), LaneQueueError>;

    /// Remove and return the oldest job of a lane.
    async fn pop(&self, lane: &QueueLane) -> Result<Option<LaneJob>, LaneQueueError>;

    /// Number of jobs waiting in a lane.
    async fn depth(&self, lane: &QueueLane) -> Result<usize, LaneQueueError>;

    /// Get queue statistics.
    async fn stats(&self) -> LaneQueueStats;
}

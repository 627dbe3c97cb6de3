//! Lane queue data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::QueueLane;

/// Configuration for the lane queue
#[derive(Debug, Clone)]
pub struct LaneQueueConfig {
    /// Key prefix for the Redis backend
    pub redis_prefix: String,
}

impl Default for LaneQueueConfig {
    fn default() -> Self {
        Self {
            redis_prefix: "relay:lanes".to_string(),
        }
    }
}

/// One outbound message handed to the notification transport.
///
/// `reference_id` lets delivery-status callbacks be correlated back to the
/// business object that triggered the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneJob {
    /// Unique job ID
    pub id: Uuid,
    pub lane: QueueLane,
    /// Event that requested the message
    pub event_type: String,
    pub channel: String,
    pub kind: String,
    pub recipient: String,
    pub priority: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<i64>,
    pub payload: Map<String, Value>,
    pub enqueued_at: DateTime<Utc>,
}

/// Statistics about the lane queue backend
#[derive(Debug, Clone, Serialize)]
pub struct LaneQueueStats {
    /// Backend type identifier
    pub backend_type: String,
    /// Jobs currently waiting, per lane
    pub lanes: Vec<LaneDepth>,
    pub total_jobs: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LaneDepth {
    pub lane: String,
    pub depth: usize,
}

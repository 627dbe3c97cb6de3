//! Delivery lanes for outbound notifications.
//!
//! # Architecture
//!
//! - `LaneClassifier`: pure mapping of channel, message kind and priority to a lane
//! - `LaneQueueBackend`: hand-off of `(lane, job)` pairs to the transport
//!   - `MemoryLaneQueue`: in-memory FIFO per lane (default)
//!   - `RedisLaneQueue`: Redis list per lane
//!
//! Use `create_lane_queue()` to create the appropriate backend based on configuration.

pub mod backend;
pub mod classifier;
mod factory;
pub mod memory_backend;
mod models;
pub mod redis_backend;

pub use backend::{LaneQueueBackend, LaneQueueError};
pub use classifier::{
    is_high_priority, Channel, LaneClassifier, QueueLane, DEFAULT_LANE, HIGH_PRIORITY_THRESHOLD,
};
pub use factory::create_lane_queue;
pub use memory_backend::MemoryLaneQueue;
pub use models::{LaneDepth, LaneJob, LaneQueueConfig, LaneQueueStats};
pub use redis_backend::RedisLaneQueue;

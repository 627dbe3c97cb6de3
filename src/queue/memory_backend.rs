//! In-memory lane queue backend using DashMap.
//!
//! Jobs are lost on restart; intended for development, tests, and
//! single-process deployments where the transport runs in the same process.

use std::collections::VecDeque;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::metrics::LANE_ENQUEUED_TOTAL;

use super::backend::{LaneQueueBackend, LaneQueueError};
use super::{LaneDepth, LaneJob, LaneQueueStats, QueueLane};

/// In-memory lane queue backend.
///
/// One FIFO `VecDeque` per lane.
#[derive(Default)]
pub struct MemoryLaneQueue {
    lanes: DashMap<String, VecDeque<LaneJob>>,
}

impl MemoryLaneQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LaneQueueBackend for MemoryLaneQueue {
    fn backend_type(&self) -> &'static str {
        "memory"
    }

    async fn enqueue(&self, job: LaneJob) -> Result<(), LaneQueueError> {
        let lane = job.lane.as_str().to_string();
        let job_id = job.id;

        let mut queue = self.lanes.entry(lane.clone()).or_default();
        queue.push_back(job);
        LANE_ENQUEUED_TOTAL.with_label_values(&[&lane]).inc();

        tracing::debug!(
            lane = %lane,
            job_id = %job_id,
            depth = queue.len(),
            "Job enqueued on lane"
        );

        Ok(())
    }

    async fn pop(&self, lane: &QueueLane) -> Result<Option<LaneJob>, LaneQueueError> {
        Ok(self
            .lanes
            .get_mut(lane.as_str())
            .and_then(|mut queue| queue.pop_front()))
    }

    async fn depth(&self, lane: &QueueLane) -> Result<usize, LaneQueueError> {
        Ok(self.lanes.get(lane.as_str()).map(|q| q.len()).unwrap_or(0))
    }

    async fn stats(&self) -> LaneQueueStats {
        let mut lanes: Vec<LaneDepth> = self
            .lanes
            .iter()
            .map(|entry| LaneDepth {
                lane: entry.key().clone(),
                depth: entry.len(),
            })
            .collect();
        lanes.sort_by(|a, b| a.lane.cmp(&b.lane));

        LaneQueueStats {
            backend_type: "memory".to_string(),
            total_jobs: lanes.iter().map(|l| l.depth).sum(),
            lanes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::Map;
    use uuid::Uuid;

    fn job(lane: &str, recipient: &str) -> LaneJob {
        LaneJob {
            id: Uuid::new_v4(),
            lane: QueueLane::new(lane),
            event_type: "EmailQueued".to_string(),
            channel: "email".to_string(),
            kind: "welcome".to_string(),
            recipient: recipient.to_string(),
            priority: 5,
            reference_id: None,
            customer_id: None,
            payload: Map::new(),
            enqueued_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_fifo_per_lane() {
        let queue = MemoryLaneQueue::new();
        let lane = QueueLane::new("email-normal");

        queue.enqueue(job("email-normal", "first@example.com")).await.unwrap();
        queue.enqueue(job("email-normal", "second@example.com")).await.unwrap();
        queue.enqueue(job("email-priority", "urgent@example.com")).await.unwrap();

        assert_eq!(queue.depth(&lane).await.unwrap(), 2);
        assert_eq!(queue.pop(&lane).await.unwrap().unwrap().recipient, "first@example.com");
        assert_eq!(queue.pop(&lane).await.unwrap().unwrap().recipient, "second@example.com");
        assert!(queue.pop(&lane).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pop_unknown_lane() {
        let queue = MemoryLaneQueue::new();
        assert!(queue.pop(&QueueLane::new("nope")).await.unwrap().is_none());
        assert_eq!(queue.depth(&QueueLane::new("nope")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stats() {
        let queue = MemoryLaneQueue::new();
        queue.enqueue(job("whatsapp-normal", "+1")).await.unwrap();
        queue.enqueue(job("email-normal", "a@b.c")).await.unwrap();
        queue.enqueue(job("email-normal", "d@e.f")).await.unwrap();

        let stats = queue.stats().await;
        assert_eq!(stats.backend_type, "memory");
        assert_eq!(stats.total_jobs, 3);
        assert_eq!(stats.lanes[0].lane, "email-normal");
        assert_eq!(stats.lanes[0].depth, 2);
    }
}

//! Event store backend trait and record types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use super::resolver::{AggregateType, Attribution};

/// Errors from event store backends.
///
/// Every variant is a hard failure: the record was not appended.
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),

    #[error("Event store unavailable: {0}")]
    Unavailable(String),
}

/// One appended record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: Uuid,
    /// Arrival order within the backend.
    pub sequence: i64,
    pub event_name: String,
    pub event_data: Map<String, Value>,
    pub aggregate_type: Option<AggregateType>,
    pub aggregate_id: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl StoredEvent {
    pub fn attribution(&self) -> Option<Attribution> {
        match (self.aggregate_type, &self.aggregate_id) {
            (Some(aggregate_type), Some(aggregate_id)) => Some(Attribution {
                aggregate_type,
                aggregate_id: aggregate_id.clone(),
            }),
            _ => None,
        }
    }
}

/// A record ready to append; the backend assigns id, sequence and time.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_name: String,
    pub event_data: Map<String, Value>,
    pub attribution: Option<Attribution>,
}

/// Append-only storage of event records.
///
/// Implementations never update or delete records and never merge two
/// appends, even when they carry identical content.
#[async_trait]
pub trait EventStoreBackend: Send + Sync {
    fn backend_type(&self) -> &'static str;

    async fn append(&self, event: NewEvent) -> Result<StoredEvent, EventStoreError>;

    /// Records attributed to one aggregate, oldest first.
    async fn events_for_aggregate(
        &self,
        aggregate_type: AggregateType,
        aggregate_id: &str,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Most recent records, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<StoredEvent>, EventStoreError>;

    async fn count(&self) -> Result<u64, EventStoreError>;
}

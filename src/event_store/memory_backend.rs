//! In-memory event store backend.
//!
//! Records are kept in a `Vec` behind a `RwLock`; appends hold the write
//! lock only long enough to assign the sequence and push. Records are lost
//! on restart.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::backend::{EventStoreBackend, EventStoreError, NewEvent, StoredEvent};
use super::resolver::AggregateType;

#[derive(Default)]
pub struct MemoryEventStore {
    records: RwLock<Vec<StoredEvent>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> EventStoreError {
        EventStoreError::Unavailable("memory store lock poisoned".to_string())
    }
}

#[async_trait]
impl EventStoreBackend for MemoryEventStore {
    fn backend_type(&self) -> &'static str {
        "memory"
    }

    async fn append(&self, event: NewEvent) -> Result<StoredEvent, EventStoreError> {
        let (aggregate_type, aggregate_id) = match event.attribution {
            Some(a) => (Some(a.aggregate_type), Some(a.aggregate_id)),
            None => (None, None),
        };

        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        let record = StoredEvent {
            id: Uuid::new_v4(),
            sequence: records.len() as i64 + 1,
            event_name: event.event_name,
            event_data: event.event_data,
            aggregate_type,
            aggregate_id,
            recorded_at: Utc::now(),
        };
        records.push(record.clone());

        Ok(record)
    }

    async fn events_for_aggregate(
        &self,
        aggregate_type: AggregateType,
        aggregate_id: &str,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(records
            .iter()
            .filter(|r| {
                r.aggregate_type == Some(aggregate_type)
                    && r.aggregate_id.as_deref() == Some(aggregate_id)
            })
            .cloned()
            .collect())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<StoredEvent>, EventStoreError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(records.iter().rev().take(limit).cloned().collect())
    }

    async fn count(&self) -> Result<u64, EventStoreError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(records.len() as u64)
    }
}

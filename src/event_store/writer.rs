use std::sync::Arc;

use serde_json::{Map, Value};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::metrics::StoreMetrics;
use crate::telemetry::attributes;

use super::backend::{EventStoreBackend, EventStoreError, NewEvent, StoredEvent};
use super::resolver::Attribution;

/// The only component that appends to the event store.
///
/// Each call produces exactly one record. Failures are returned to the
/// caller, never swallowed.
#[derive(Clone)]
pub struct EventStoreWriter {
    backend: Arc<dyn EventStoreBackend>,
}

impl EventStoreWriter {
    pub fn new(backend: Arc<dyn EventStoreBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn EventStoreBackend> {
        &self.backend
    }

    #[tracing::instrument(
        name = "event_store.store",
        skip(self, event_data),
        fields(backend = self.backend.backend_type())
    )]
    pub async fn store(
        &self,
        event_name: &str,
        event_data: Map<String, Value>,
        attribution: Option<Attribution>,
    ) -> Result<StoredEvent, EventStoreError> {
        let backend = self.backend.backend_type();
        let attributed = attribution.is_some();

        let span = tracing::Span::current();
        let attribute = attributes::store_backend(backend);
        span.set_attribute(attribute.key, attribute.value);
        if let Some(attribution) = &attribution {
            for attribute in
                attributes::aggregate(attribution.aggregate_type.as_str(), &attribution.aggregate_id)
            {
                span.set_attribute(attribute.key, attribute.value);
            }
        }

        let result = self
            .backend
            .append(NewEvent {
                event_name: event_name.to_string(),
                event_data,
                attribution,
            })
            .await;

        match &result {
            Ok(record) => {
                StoreMetrics::record_append(backend, attributed);
                tracing::debug!(
                    record_id = %record.id,
                    sequence = record.sequence,
                    aggregate_type = ?record.aggregate_type,
                    aggregate_id = ?record.aggregate_id,
                    "Event stored"
                );
            }
            Err(e) => {
                StoreMetrics::record_failure(backend);
                tracing::error!(event_name = %event_name, error = %e, "Event store append failed");
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::{AggregateType, MemoryEventStore};
    use async_trait::async_trait;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_store_preserves_call_order() {
        let writer = EventStoreWriter::new(Arc::new(MemoryEventStore::new()));
        let attribution = Some(Attribution::new(AggregateType::Customer, 1));

        let first = writer.store("A", data(json!({"i": 1})), attribution.clone()).await.unwrap();
        let second = writer.store("B", data(json!({"i": 2})), attribution.clone()).await.unwrap();
        let third = writer.store("C", data(json!({"i": 3})), attribution).await.unwrap();

        assert!(first.sequence < second.sequence && second.sequence < third.sequence);
        assert_eq!(writer.backend().count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_identical_content_is_not_merged() {
        let writer = EventStoreWriter::new(Arc::new(MemoryEventStore::new()));
        let a = writer.store("Same", data(json!({"x": 1})), None).await.unwrap();
        let b = writer.store("Same", data(json!({"x": 1})), None).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(writer.backend().count().await.unwrap(), 2);
    }

    struct BrokenStore;

    #[async_trait]
    impl EventStoreBackend for BrokenStore {
        fn backend_type(&self) -> &'static str {
            "broken"
        }

        async fn append(&self, _event: NewEvent) -> Result<StoredEvent, EventStoreError> {
            Err(EventStoreError::Unavailable("disk full".into()))
        }

        async fn events_for_aggregate(
            &self,
            _aggregate_type: AggregateType,
            _aggregate_id: &str,
        ) -> Result<Vec<StoredEvent>, EventStoreError> {
            Ok(vec![])
        }

        async fn recent(&self, _limit: usize) -> Result<Vec<StoredEvent>, EventStoreError> {
            Ok(vec![])
        }

        async fn count(&self) -> Result<u64, EventStoreError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_failure_is_returned() {
        let writer = EventStoreWriter::new(Arc::new(BrokenStore));
        let result = writer.store("A", Map::new(), None).await;
        assert!(matches!(result, Err(EventStoreError::Unavailable(_))));
    }
}

//! PostgreSQL event store backend.
//!
//! Expected table (migrations are managed outside this crate):
//!
//! ```sql
//! CREATE TABLE stored_events (
//!     id             UUID PRIMARY KEY,
//!     sequence       BIGSERIAL UNIQUE,
//!     event_name     TEXT NOT NULL,
//!     event_data     JSONB NOT NULL,
//!     aggregate_type TEXT,
//!     aggregate_id   TEXT,
//!     recorded_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     CHECK ((aggregate_type IS NULL) = (aggregate_id IS NULL))
//! );
//! CREATE INDEX stored_events_aggregate ON stored_events (aggregate_type, aggregate_id, sequence);
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use super::backend::{EventStoreBackend, EventStoreError, NewEvent, StoredEvent};
use super::resolver::AggregateType;

type EventRow = (
    Uuid,
    i64,
    String,
    Value,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
);

pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn from_row(row: EventRow) -> Result<StoredEvent, EventStoreError> {
        let (id, sequence, event_name, event_data, aggregate_type, aggregate_id, recorded_at) = row;

        let event_data = match event_data {
            Value::Object(map) => map,
            other => {
                return Err(EventStoreError::InvalidRecord(format!(
                    "event_data of {} is not an object: {}",
                    id, other
                )))
            }
        };
        let aggregate_type = aggregate_type
            .map(|t| t.parse::<AggregateType>())
            .transpose()
            .map_err(EventStoreError::InvalidRecord)?;

        Ok(StoredEvent {
            id,
            sequence,
            event_name,
            event_data,
            aggregate_type,
            aggregate_id,
            recorded_at,
        })
    }
}

#[async_trait]
impl EventStoreBackend for PostgresEventStore {
    fn backend_type(&self) -> &'static str {
        "postgres"
    }

    async fn append(&self, event: NewEvent) -> Result<StoredEvent, EventStoreError> {
        let id = Uuid::new_v4();
        let (aggregate_type, aggregate_id) = match &event.attribution {
            Some(a) => (Some(a.aggregate_type.as_str()), Some(a.aggregate_id.as_str())),
            None => (None, None),
        };
        let event_data = Value::Object(event.event_data.clone());

        let (sequence, recorded_at): (i64, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO stored_events (id, event_name, event_data, aggregate_type, aggregate_id, recorded_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING sequence, recorded_at
            "#,
        )
        .bind(id)
        .bind(&event.event_name)
        .bind(&event_data)
        .bind(aggregate_type)
        .bind(aggregate_id)
        .fetch_one(&self.pool)
        .await?;

        tracing::trace!(
            record_id = %id,
            sequence = sequence,
            event_name = %event.event_name,
            "Event appended to PostgreSQL"
        );

        Ok(StoredEvent {
            id,
            sequence,
            event_name: event.event_name,
            event_data: event.event_data,
            aggregate_type: event.attribution.as_ref().map(|a| a.aggregate_type),
            aggregate_id: event.attribution.map(|a| a.aggregate_id),
            recorded_at,
        })
    }

    async fn events_for_aggregate(
        &self,
        aggregate_type: AggregateType,
        aggregate_id: &str,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT id, sequence, event_name, event_data, aggregate_type, aggregate_id, recorded_at
            FROM stored_events
            WHERE aggregate_type = $1 AND aggregate_id = $2
            ORDER BY sequence ASC
            "#,
        )
        .bind(aggregate_type.as_str())
        .bind(aggregate_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::from_row).collect()
    }

    async fn recent(&self, limit: usize) -> Result<Vec<StoredEvent>, EventStoreError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT id, sequence, event_name, event_data, aggregate_type, aggregate_id, recorded_at
            FROM stored_events
            ORDER BY sequence DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::from_row).collect()
    }

    async fn count(&self) -> Result<u64, EventStoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stored_events")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(event_data: Value, aggregate_type: Option<&str>) -> EventRow {
        (
            Uuid::nil(),
            7,
            "QuotationGenerated".to_string(),
            event_data,
            aggregate_type.map(str::to_string),
            aggregate_type.map(|_| "42".to_string()),
            Utc::now(),
        )
    }

    #[test]
    fn test_from_row() {
        let record =
            PostgresEventStore::from_row(row(json!({"total": 10}), Some("Quotation"))).unwrap();
        assert_eq!(record.sequence, 7);
        assert_eq!(record.aggregate_type, Some(AggregateType::Quotation));
        assert_eq!(record.aggregate_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_from_row_rejects_unknown_aggregate() {
        let result = PostgresEventStore::from_row(row(json!({}), Some("Invoice")));
        assert!(matches!(result, Err(EventStoreError::InvalidRecord(_))));
    }

    #[test]
    fn test_from_row_rejects_non_object_data() {
        let result = PostgresEventStore::from_row(row(json!([1, 2]), None));
        assert!(matches!(result, Err(EventStoreError::InvalidRecord(_))));
    }
}

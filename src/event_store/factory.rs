//! Event store backend factory

use std::sync::Arc;

use crate::config::EventStoreSettings;
use crate::postgres::PostgresPool;

use super::backend::{EventStoreBackend, EventStoreError};
use super::memory_backend::MemoryEventStore;
use super::postgres_backend::PostgresEventStore;

/// Create an event store backend based on configuration.
///
/// - `"postgres"`: Returns a `PostgresEventStore`; a missing pool is an error
/// - `"memory"` (default): Returns a `MemoryEventStore`
///
/// Unlike the lane queue there is no fallback to memory.
pub fn create_event_store(
    settings: &EventStoreSettings,
    postgres: Option<&PostgresPool>,
) -> Result<Arc<dyn EventStoreBackend>, EventStoreError> {
    match settings.backend.as_str() {
        "postgres" => {
            let pool = postgres.ok_or_else(|| {
                EventStoreError::Unavailable(
                    "postgres event store requires database.url".to_string(),
                )
            })?;
            tracing::info!(
                backend = "postgres",
                database = %pool.database_url_masked(),
                "Creating PostgreSQL event store"
            );
            Ok(Arc::new(PostgresEventStore::new(pool.pool().clone())))
        }
        "memory" => {
            tracing::info!(backend = "memory", "Creating memory event store");
            Ok(Arc::new(MemoryEventStore::new()))
        }
        other => Err(EventStoreError::Unavailable(format!(
            "unknown event store backend '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_is_default() {
        let store = create_event_store(&EventStoreSettings::default(), None).unwrap();
        assert_eq!(store.backend_type(), "memory");
    }

    #[test]
    fn test_postgres_without_pool_is_an_error() {
        let settings = EventStoreSettings {
            backend: "postgres".to_string(),
        };
        assert!(matches!(
            create_event_store(&settings, None),
            Err(EventStoreError::Unavailable(_))
        ));
    }

    #[test]
    fn test_unknown_backend_is_an_error() {
        let settings = EventStoreSettings {
            backend: "sqlite".to_string(),
        };
        assert!(create_event_store(&settings, None).is_err());
    }
}

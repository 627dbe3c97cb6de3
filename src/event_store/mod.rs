//! Append-only event store with aggregate attribution.
//!
//! # Architecture
//!
//! - `AggregateResolver`: ordered rule chain mapping event references to an aggregate
//! - `EventDataExtractor`: structured export, or serialized fields minus plumbing
//! - `EventStoreWriter`: single append path, reports failures to the caller
//! - `EventStoreBackend`: storage
//!   - `MemoryEventStore`: in-process (default)
//!   - `PostgresEventStore`: `stored_events` table
//!
//! Use `create_event_store()` to create the appropriate backend based on configuration.

pub mod backend;
pub mod extractor;
mod factory;
pub mod memory_backend;
pub mod postgres_backend;
pub mod resolver;
mod writer;

pub use backend::{EventStoreBackend, EventStoreError, NewEvent, StoredEvent};
pub use extractor::{EventDataExtractor, ExtractError, FieldCollector, EXCLUDED_FIELDS};
pub use factory::create_event_store;
pub use memory_backend::MemoryEventStore;
pub use postgres_backend::PostgresEventStore;
pub use resolver::{AggregateResolver, AggregateType, Attribution};
pub use writer::EventStoreWriter;

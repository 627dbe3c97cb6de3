//! PostgreSQL connection pooling for the event store.

pub mod pool;

pub use pool::{PostgresPool, PostgresPoolError};

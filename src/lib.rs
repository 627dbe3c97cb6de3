// Shared infrastructure
pub mod config;
pub mod error;
pub mod metrics;
pub mod postgres;
pub mod redis;
pub mod telemetry;

// Domain layer
pub mod catalog;
pub mod event;
pub mod event_store;
pub mod queue;

// Application layer
pub mod api;
pub mod dispatch;
pub mod server;
pub mod tasks;
pub mod triggers;

//! API layer - HTTP endpoint handlers.

mod events;
mod health;
mod metrics;
mod routes;

pub use events::{aggregate_events, lane_stats, recent_events, RecentQuery};
pub use health::{health, HealthResponse};
pub use metrics::prometheus_metrics;
pub use routes::api_routes;

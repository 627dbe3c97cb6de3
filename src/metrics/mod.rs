//! Prometheus metrics for the event relay.
//!
//! - Dispatch metrics (events dispatched, listener outcomes)
//! - Event store metrics (appends, failures by backend)
//! - Lane metrics (enqueues by lane, unknown channel fallbacks)
//! - Redis trigger metrics

mod helpers;

pub use helpers::{
    encode_metrics, event_type_label, DispatchMetrics, StoreMetrics, TriggerMetrics,
    OTHER_EVENT_TYPE,
};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    register_int_gauge_vec, Histogram, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "relay";

lazy_static! {
    // ============================================================================
    // Dispatch Metrics
    // ============================================================================

    /// Total events dispatched on the bus, by catalog event type or `other`
    pub static ref EVENTS_DISPATCHED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_events_dispatched_total", METRIC_PREFIX),
        "Total events dispatched on the bus",
        &["event_type"]
    ).unwrap();

    /// Listener runs that completed
    pub static ref LISTENER_COMPLETED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_listener_completed_total", METRIC_PREFIX),
        "Total listener runs that completed",
        &["listener"]
    ).unwrap();

    /// Listener runs that failed (error or panic) and were logged
    pub static ref LISTENER_FAILED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_listener_failed_total", METRIC_PREFIX),
        "Total listener runs that failed and were logged",
        &["listener"]
    ).unwrap();

    /// Time spent dispatching one event to all its listeners
    pub static ref DISPATCH_LATENCY: Histogram = register_histogram!(
        format!("{}_dispatch_latency_seconds", METRIC_PREFIX),
        "Event dispatch latency in seconds",
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]
    ).unwrap();

    // ============================================================================
    // Event Store Metrics
    // ============================================================================

    /// Records appended, by backend
    pub static ref STORE_APPENDS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_store_appends_total", METRIC_PREFIX),
        "Total event store records appended",
        &["backend"]
    ).unwrap();

    /// Append failures, by backend
    pub static ref STORE_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_store_failures_total", METRIC_PREFIX),
        "Total event store append failures",
        &["backend"]
    ).unwrap();

    /// Records appended without aggregate attribution
    pub static ref STORE_UNATTRIBUTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_store_unattributed_total", METRIC_PREFIX),
        "Total event store records without aggregate attribution"
    ).unwrap();

    /// Fields skipped by the extractor because they failed to serialize
    pub static ref EXTRACTOR_SKIPPED_FIELDS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_extractor_skipped_fields_total", METRIC_PREFIX),
        "Total event fields skipped during extraction"
    ).unwrap();

    // ============================================================================
    // Lane Metrics
    // ============================================================================

    /// Jobs enqueued, by lane
    pub static ref LANE_ENQUEUED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_lane_enqueued_total", METRIC_PREFIX),
        "Total jobs enqueued on delivery lanes",
        &["lane"]
    ).unwrap();

    /// Jobs waiting per lane, refreshed on scrape
    pub static ref LANE_DEPTH: IntGaugeVec = register_int_gauge_vec!(
        format!("{}_lane_depth", METRIC_PREFIX),
        "Jobs currently waiting per delivery lane",
        &["lane"]
    ).unwrap();

    /// Records in the event store, refreshed on scrape
    pub static ref STORE_RECORDS: IntGauge = register_int_gauge!(
        format!("{}_store_records", METRIC_PREFIX),
        "Records currently in the event store"
    ).unwrap();

    /// Classifications that fell back to the default lane
    pub static ref LANE_FALLBACK_TOTAL: IntCounter = register_int_counter!(
        format!("{}_lane_fallback_total", METRIC_PREFIX),
        "Total classifications routed to the default lane"
    ).unwrap();

    /// Notifications skipped because their channel is disabled
    pub static ref NOTIFICATIONS_SUPPRESSED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_notifications_suppressed_total", METRIC_PREFIX),
        "Total notifications skipped for disabled channels",
        &["channel"]
    ).unwrap();

    // ============================================================================
    // Redis Trigger Metrics
    // ============================================================================

    /// Redis connection status (1 = connected, 0 = disconnected)
    pub static ref REDIS_CONNECTION_STATUS: IntGauge = register_int_gauge!(
        format!("{}_redis_connection_status", METRIC_PREFIX),
        "Redis connection status (1=connected, 0=disconnected)"
    ).unwrap();

    /// Total Redis reconnection attempts
    pub static ref REDIS_RECONNECTIONS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_redis_reconnections_total", METRIC_PREFIX),
        "Total Redis reconnection attempts"
    ).unwrap();

    /// Envelopes received from Redis pub/sub
    pub static ref TRIGGER_RECEIVED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_trigger_received_total", METRIC_PREFIX),
        "Total messages received from Redis pub/sub"
    ).unwrap();

    /// Messages rejected because they were not valid envelopes
    pub static ref TRIGGER_REJECTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_trigger_rejected_total", METRIC_PREFIX),
        "Total malformed messages rejected by the Redis trigger"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics() {
        // lazy_static requires first access
        STORE_UNATTRIBUTED_TOTAL.inc();

        let result = encode_metrics();
        assert!(result.is_ok());
        let output = result.unwrap();
        assert!(output.contains("relay_store_unattributed_total"));
    }

    #[test]
    fn test_dispatch_metrics() {
        EVENTS_DISPATCHED_TOTAL.with_label_values(&["CustomerRegistered"]).inc();
        LISTENER_COMPLETED_TOTAL.with_label_values(&["event_store"]).inc();
        LISTENER_FAILED_TOTAL.with_label_values(&["notification"]).inc();
        DISPATCH_LATENCY.observe(0.002);
    }

    #[test]
    fn test_event_type_label_is_bounded() {
        assert_eq!(event_type_label("EmailQueued"), "EmailQueued");
        assert_eq!(event_type_label("Junk42"), OTHER_EVENT_TYPE);
        assert_eq!(event_type_label(""), OTHER_EVENT_TYPE);
    }

    #[test]
    fn test_lane_metrics() {
        let before = LANE_FALLBACK_TOTAL.get();
        LANE_FALLBACK_TOTAL.inc();
        assert!(LANE_FALLBACK_TOTAL.get() > before);

        LANE_ENQUEUED_TOTAL.with_label_values(&["email-priority"]).inc();
    }
}

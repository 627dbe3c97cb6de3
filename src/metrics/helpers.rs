//! Metric helpers grouped by concern.

use prometheus::{Encoder, TextEncoder};

use super::*;
use crate::catalog::EVENT_TYPES;

/// Label used for event types outside the catalog
pub const OTHER_EVENT_TYPE: &str = "other";

/// Bounded `event_type` label value.
///
/// Event types come from untrusted producers, so only catalog names get
/// their own series.
pub fn event_type_label(event_type: &str) -> &str {
    if EVENT_TYPES.contains(&event_type) {
        event_type
    } else {
        OTHER_EVENT_TYPE
    }
}

/// Encode all registered metrics in Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording dispatch metrics
pub struct DispatchMetrics;

impl DispatchMetrics {
    pub fn record_dispatched(event_type: &str) {
        EVENTS_DISPATCHED_TOTAL
            .with_label_values(&[event_type_label(event_type)])
            .inc();
    }

    pub fn record_completed(listener: &str) {
        LISTENER_COMPLETED_TOTAL.with_label_values(&[listener]).inc();
    }

    pub fn record_failed(listener: &str) {
        LISTENER_FAILED_TOTAL.with_label_values(&[listener]).inc();
    }

    pub fn observe_latency(seconds: f64) {
        DISPATCH_LATENCY.observe(seconds);
    }
}

/// Helper struct for recording event store metrics
pub struct StoreMetrics;

impl StoreMetrics {
    pub fn record_append(backend: &str, attributed: bool) {
        STORE_APPENDS_TOTAL.with_label_values(&[backend]).inc();
        if !attributed {
            STORE_UNATTRIBUTED_TOTAL.inc();
        }
    }

    pub fn record_failure(backend: &str) {
        STORE_FAILURES_TOTAL.with_label_values(&[backend]).inc();
    }

    pub fn record_skipped_field() {
        EXTRACTOR_SKIPPED_FIELDS_TOTAL.inc();
    }
}

/// Helper struct for recording Redis trigger metrics
pub struct TriggerMetrics;

impl TriggerMetrics {
    pub fn set_connected(connected: bool) {
        REDIS_CONNECTION_STATUS.set(if connected { 1 } else { 0 });
    }

    pub fn record_reconnection() {
        REDIS_RECONNECTIONS_TOTAL.inc();
    }

    pub fn record_received() {
        TRIGGER_RECEIVED_TOTAL.inc();
    }

    pub fn record_rejected() {
        TRIGGER_REJECTED_TOTAL.inc();
    }
}

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::event::DomainEvent;
use crate::metrics::DispatchMetrics;
use crate::telemetry::attributes;

use super::listener::{isolate, Isolated, Listener, ListenerState};

/// Which events a registration receives.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Subscription {
    EventType(String),
    All,
}

impl Subscription {
    fn matches(&self, event_type: &str) -> bool {
        match self {
            Subscription::EventType(t) => t == event_type,
            Subscription::All => true,
        }
    }
}

struct Registration {
    subscription: Subscription,
    shell: Isolated<Arc<dyn Listener>>,
}

/// Final state of one listener for one dispatched event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListenerOutcome {
    pub listener: String,
    pub state: ListenerState,
}

/// What happened when an event was dispatched.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub event_type: String,
    pub outcomes: Vec<ListenerOutcome>,
}

impl DispatchReport {
    pub fn completed(&self) -> usize {
        self.count(ListenerState::Completed)
    }

    pub fn failed(&self) -> usize {
        self.count(ListenerState::FailedLogged)
    }

    /// True when no listener was registered for the event.
    pub fn is_unhandled(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn state_of(&self, listener: &str) -> Option<ListenerState> {
        self.outcomes
            .iter()
            .find(|o| o.listener == listener)
            .map(|o| o.state)
    }

    fn count(&self, state: ListenerState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }
}

/// Broadcasts events to registered listeners.
///
/// Listeners run one after another in registration order, each inside its
/// own isolating shell, so a failing listener never stops the next one and
/// `dispatch` never fails.
#[derive(Default)]
pub struct EventBus {
    registrations: Vec<Registration>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for one event type.
    pub fn listen<L>(&mut self, event_type: impl Into<String>, listener: L) -> &mut Self
    where
        L: Listener + 'static,
    {
        self.register(Subscription::EventType(event_type.into()), Arc::new(listener))
    }

    /// Register a listener for every event.
    pub fn listen_all<L>(&mut self, listener: L) -> &mut Self
    where
        L: Listener + 'static,
    {
        self.register(Subscription::All, Arc::new(listener))
    }

    fn register(&mut self, subscription: Subscription, listener: Arc<dyn Listener>) -> &mut Self {
        tracing::debug!(
            listener = %listener.name(),
            subscription = ?subscription,
            "Listener registered"
        );
        self.registrations.push(Registration {
            subscription,
            shell: isolate(listener),
        });
        self
    }

    pub fn listener_count(&self) -> usize {
        self.registrations.len()
    }

    #[tracing::instrument(name = "event_bus.dispatch", skip_all, fields(event_type = %event.event_type()))]
    pub async fn dispatch(&self, event: &dyn DomainEvent) -> DispatchReport {
        let started = Instant::now();
        let event_type = event.event_type();

        let span = tracing::Span::current();
        let attribute = attributes::event_type(event_type);
        span.set_attribute(attribute.key, attribute.value);
        if let Some(reference_id) = event.reference_id() {
            let attribute = attributes::reference_id(reference_id);
            span.set_attribute(attribute.key, attribute.value);
        }
        if let Some(customer_id) = event.customer_id() {
            let attribute = attributes::customer_id(customer_id);
            span.set_attribute(attribute.key, attribute.value);
        }

        DispatchMetrics::record_dispatched(event_type);

        let mut outcomes = Vec::new();
        for registration in self
            .registrations
            .iter()
            .filter(|r| r.subscription.matches(event_type))
        {
            let state = registration.shell.run(event).await;
            outcomes.push(ListenerOutcome {
                listener: registration.shell.name().to_string(),
                state,
            });
        }

        DispatchMetrics::observe_latency(started.elapsed().as_secs_f64());

        if outcomes.is_empty() {
            tracing::debug!(event_type = %event_type, "No listeners for event");
        }

        DispatchReport {
            event_type: event_type.to_string(),
            outcomes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::ListenerError;
    use crate::event::EventEnvelope;
    use async_trait::async_trait;
    use serde_json::Map;
    use std::sync::Mutex;

    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl Listener for Recording {
        fn name(&self) -> &str {
            self.name
        }

        async fn handle(&self, event: &dyn DomainEvent) -> Result<(), ListenerError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, event.event_type()));
            if self.fail {
                return Err(ListenerError::Rejected("nope".into()));
            }
            Ok(())
        }
    }

    fn recording(name: &'static str, log: &Arc<Mutex<Vec<String>>>, fail: bool) -> Recording {
        Recording {
            name,
            log: log.clone(),
            fail,
        }
    }

    #[tokio::test]
    async fn test_registration_order_and_filtering() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.listen_all(recording("store", &log, false))
            .listen("EmailQueued", recording("email", &log, false))
            .listen("CustomerRegistered", recording("welcome", &log, false));

        let report = bus
            .dispatch(&EventEnvelope::new("EmailQueued", Map::new()))
            .await;

        assert_eq!(report.completed(), 2);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["store:EmailQueued".to_string(), "email:EmailQueued".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_later_listeners() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.listen_all(recording("first", &log, true))
            .listen_all(recording("second", &log, false));

        let report = bus.dispatch(&EventEnvelope::new("Anything", Map::new())).await;

        assert_eq!(report.state_of("first"), Some(ListenerState::FailedLogged));
        assert_eq!(report.state_of("second"), Some(ListenerState::Completed));
        assert_eq!(report.failed(), 1);
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_uncataloged_event_types_share_one_series() {
        let bus = EventBus::new();
        for i in 0..50 {
            bus.dispatch(&EventEnvelope::new(format!("Uncataloged{}", i), Map::new()))
                .await;
        }

        let output = crate::metrics::encode_metrics().unwrap();
        assert!(!output.contains("event_type=\"Uncataloged"));
        assert!(output.contains("event_type=\"other\""));
    }

    #[tokio::test]
    async fn test_unhandled_event() {
        let bus = EventBus::new();
        let report = bus.dispatch(&EventEnvelope::new("Nobody", Map::new())).await;
        assert!(report.is_unhandled());
        assert_eq!(bus.listener_count(), 0);
    }
}

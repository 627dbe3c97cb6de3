//! Listener contract and the failure-isolating shell around it.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use thiserror::Error;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::event::DomainEvent;
use crate::event_store::{AggregateResolver, EventStoreError};
use crate::metrics::DispatchMetrics;
use crate::queue::LaneQueueError;
use crate::telemetry::attributes;

/// Why a listener could not complete its effect.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("event store: {0}")]
    Storage(#[from] EventStoreError),

    #[error("lane queue: {0}")]
    Queue(#[from] LaneQueueError),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("panicked: {0}")]
    Panicked(String),
}

/// A reaction to dispatched events.
///
/// Listeners get a shared reference and cannot alter the event. They must
/// not depend on other listeners having run.
#[async_trait]
pub trait Listener: Send + Sync {
    /// Stable name used in logs and metrics.
    fn name(&self) -> &str;

    async fn handle(&self, event: &dyn DomainEvent) -> Result<(), ListenerError>;
}

#[async_trait]
impl<L: Listener + ?Sized> Listener for Arc<L> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn handle(&self, event: &dyn DomainEvent) -> Result<(), ListenerError> {
        (**self).handle(event).await
    }
}

/// Lifecycle of one listener invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerState {
    Pending,
    Running,
    Completed,
    FailedLogged,
}

impl ListenerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ListenerState::Completed | ListenerState::FailedLogged)
    }

    pub fn can_transition_to(&self, next: ListenerState) -> bool {
        matches!(
            (self, next),
            (ListenerState::Pending, ListenerState::Running)
                | (ListenerState::Running, ListenerState::Completed)
                | (ListenerState::Running, ListenerState::FailedLogged)
        )
    }

    fn advance(&mut self, next: ListenerState) {
        debug_assert!(
            self.can_transition_to(next),
            "invalid listener transition {:?} -> {:?}",
            self,
            next
        );
        *self = next;
    }
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ListenerState::Pending => "pending",
            ListenerState::Running => "running",
            ListenerState::Completed => "completed",
            ListenerState::FailedLogged => "failed_logged",
        };
        f.write_str(s)
    }
}

/// Wraps a listener so that its errors and panics end at the shell.
///
/// Failures are logged with the event's correlation ids and never reach
/// the dispatcher or the producer. There is no inline retry.
pub struct Isolated<L> {
    inner: L,
}

/// Wrap `listener` in the failure-isolating shell.
pub fn isolate<L: Listener>(listener: L) -> Isolated<L> {
    Isolated { inner: listener }
}

impl<L: Listener> Isolated<L> {
    pub fn inner(&self) -> &L {
        &self.inner
    }

    /// Run the listener once and return the terminal state.
    #[tracing::instrument(name = "listener.run", skip_all, fields(listener = %self.inner.name()))]
    pub async fn run(&self, event: &dyn DomainEvent) -> ListenerState {
        let mut state = ListenerState::Pending;
        let name = self.inner.name();

        let attribute = attributes::listener(name);
        tracing::Span::current().set_attribute(attribute.key, attribute.value);

        state.advance(ListenerState::Running);
        tracing::trace!(listener = %name, event_type = %event.event_type(), "Listener running");

        let outcome = AssertUnwindSafe(self.inner.handle(event))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ListenerError::Panicked(panic_message(panic.as_ref()))));

        match outcome {
            Ok(()) => {
                state.advance(ListenerState::Completed);
                DispatchMetrics::record_completed(name);
            }
            Err(error) => {
                log_failure(name, event, &error);
                state.advance(ListenerState::FailedLogged);
                DispatchMetrics::record_failed(name);
            }
        }

        state
    }
}

#[async_trait]
impl<L: Listener> Listener for Isolated<L> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    /// Always `Ok`: failures were already logged by the shell.
    async fn handle(&self, event: &dyn DomainEvent) -> Result<(), ListenerError> {
        self.run(event).await;
        Ok(())
    }
}

fn log_failure(listener: &str, event: &dyn DomainEvent, error: &ListenerError) {
    let attribution = AggregateResolver.resolve(event);

    tracing::error!(
        listener = %listener,
        event_type = %event.event_type(),
        aggregate_type = ?attribution.as_ref().map(|a| a.aggregate_type),
        aggregate_id = ?attribution.as_ref().map(|a| a.aggregate_id.as_str()),
        customer_id = ?event.customer_id(),
        reference_id = ?event.reference_id(),
        error = %error,
        "Listener failed, event left for the broker's retry policy"
    );
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

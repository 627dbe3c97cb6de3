//! Event dispatch.
//!
//! `EventBus` hands each event to its listeners in registration order.
//! Every listener runs inside an [`Isolated`] shell: an error or panic in
//! one listener is logged and counted, and the remaining listeners still run.

mod bus;
mod listener;
mod listeners;

pub use bus::{DispatchReport, EventBus, ListenerOutcome};
pub use listener::{isolate, Isolated, Listener, ListenerError, ListenerState};
pub use listeners::{EventStoreListener, NotificationListener};

//! Domain events and the capabilities listeners rely on.
//!
//! Producers either build a generic [`EventEnvelope`] (for example when the
//! event arrives as JSON over Redis) or define their own type implementing
//! [`DomainEvent`]. Listeners never switch on concrete event types; they go
//! through the capability traits:
//!
//! - [`EventReferences`]: which business entities the event points at
//! - [`Notifiable`]: outbound communication details, if the event requests one
//! - [`DomainEvent::export_fields`]: the producer's own field map, if any

mod envelope;
mod references;
mod traits;

pub use envelope::{EnvelopeBuilder, EventEnvelope, DEFAULT_PRIORITY};
pub use references::{EntityRef, EventReferences};
pub use traits::{DomainEvent, Notifiable};

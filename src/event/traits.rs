use std::fmt;

use serde_json::{Map, Value};

use super::references::EventReferences;

/// A domain occurrence that can be dispatched to listeners.
///
/// Implementors are immutable once constructed; listeners only ever see
/// `&dyn DomainEvent`. Serialization through `erased_serde` is what the
/// event store falls back to when the event has no structured export.
pub trait DomainEvent: EventReferences + erased_serde::Serialize + fmt::Debug + Send + Sync {
    /// Identifier unique per event kind, e.g. `"CustomerRegistered"`.
    fn event_type(&self) -> &str;

    /// 1 (highest) to 10 (lowest). Values outside the range are passed through.
    fn priority(&self) -> i32 {
        super::DEFAULT_PRIORITY
    }

    /// Correlates the event with a business object, e.g. `"quotation_42"`.
    fn reference_id(&self) -> Option<&str> {
        None
    }

    /// The producer's authoritative field map.
    ///
    /// When present it is stored verbatim instead of the introspected fields.
    fn export_fields(&self) -> Option<Map<String, Value>> {
        None
    }

    /// Dynamic payload for events that carry their fields as a map rather
    /// than as struct fields.
    fn payload(&self) -> Option<&Map<String, Value>> {
        None
    }

    /// Outbound communication details, for events that request one.
    fn as_notifiable(&self) -> Option<&dyn Notifiable> {
        None
    }
}

erased_serde::serialize_trait_object!(DomainEvent);

/// Capability of events that ask for an outbound message.
pub trait Notifiable: Send + Sync {
    /// Communication channel family, e.g. `"email"` or `"whatsapp"`.
    fn channel(&self) -> &str;

    /// Message kind within the family, e.g. `"password_reset"`.
    fn message_kind(&self) -> &str;

    /// Address, phone number, or other channel-specific destination.
    fn recipient(&self) -> &str;

    /// Fields handed to the transport alongside the lane.
    fn notification_payload(&self) -> Map<String, Value>;
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::references::{parse_id, EntityRef, EventReferences};
use super::traits::{DomainEvent, Notifiable};

/// Priority assigned when the producer does not specify one.
pub const DEFAULT_PRIORITY: i32 = 5;

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

/// Immutable description of one domain occurrence.
///
/// Fields are only readable; follow-on events are new envelopes built with
/// [`EventEnvelope::follow_on`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    payload: Map<String, Value>,
    #[serde(default = "default_priority")]
    priority: i32,
    #[serde(default, alias = "referenceId", skip_serializing_if = "Option::is_none")]
    reference_id: Option<String>,
    #[serde(default, alias = "customerId", skip_serializing_if = "Option::is_none")]
    customer_id: Option<i64>,
    #[serde(default = "Utc::now", alias = "queuedAt")]
    queued_at: DateTime<Utc>,
}

impl EventEnvelope {
    /// Create an envelope with default priority and no correlation ids.
    pub fn new(event_type: impl Into<String>, payload: Map<String, Value>) -> Self {
        EnvelopeBuilder::new(event_type).payload(payload).build()
    }

    pub fn builder(event_type: impl Into<String>) -> EnvelopeBuilder {
        EnvelopeBuilder::new(event_type)
    }

    /// Build a new envelope that carries this one's priority and
    /// correlation ids. The original is left untouched.
    pub fn follow_on(&self, event_type: impl Into<String>, payload: Map<String, Value>) -> Self {
        let mut builder = EnvelopeBuilder::new(event_type)
            .payload(payload)
            .priority(self.priority);
        if let Some(reference_id) = &self.reference_id {
            builder = builder.reference_id(reference_id.clone());
        }
        if let Some(customer_id) = self.customer_id {
            builder = builder.customer_id(customer_id);
        }
        builder.build()
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn reference_id(&self) -> Option<&str> {
        self.reference_id.as_deref()
    }

    /// The envelope's customer id, or a `customerId` carried in the payload.
    ///
    /// Same answer as [`EventReferences::customer_id`].
    pub fn customer_id(&self) -> Option<i64> {
        <Self as EventReferences>::customer_id(self)
    }

    pub fn queued_at(&self) -> DateTime<Utc> {
        self.queued_at
    }

    fn payload_ref(&self, keys: &[&str]) -> Option<EntityRef> {
        keys.iter()
            .find_map(|key| self.payload.get(*key).and_then(EntityRef::from_value))
    }

    fn payload_str(&self, keys: &[&str]) -> &str {
        keys.iter()
            .find_map(|key| self.payload.get(*key).and_then(Value::as_str))
            .unwrap_or_default()
    }
}

/// Builder for [`EventEnvelope`]
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder {
    event_type: String,
    payload: Map<String, Value>,
    priority: i32,
    reference_id: Option<String>,
    customer_id: Option<i64>,
}

impl EnvelopeBuilder {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            payload: Map::new(),
            priority: DEFAULT_PRIORITY,
            reference_id: None,
            customer_id: None,
        }
    }

    /// Replace the whole payload
    pub fn payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    /// Set a single payload field
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn reference_id(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn customer_id(mut self, customer_id: i64) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn build(self) -> EventEnvelope {
        EventEnvelope {
            event_type: self.event_type,
            payload: self.payload,
            priority: self.priority,
            reference_id: self.reference_id,
            customer_id: self.customer_id,
            queued_at: Utc::now(),
        }
    }
}

impl EventReferences for EventEnvelope {
    fn customer(&self) -> Option<EntityRef> {
        self.payload_ref(&["customer"])
    }

    fn quotation(&self) -> Option<EntityRef> {
        self.payload_ref(&["quotation"])
    }

    fn policy(&self) -> Option<EntityRef> {
        self.payload_ref(&["policy"])
    }

    fn renewal(&self) -> Option<(EntityRef, EntityRef)> {
        let original = self.payload_ref(&["originalPolicy", "original_policy"])?;
        let renewed = self.payload_ref(&["renewedPolicy", "renewed_policy"])?;
        Some((original, renewed))
    }

    fn customer_id(&self) -> Option<i64> {
        self.customer_id.or_else(|| {
            ["customerId", "customer_id"]
                .iter()
                .find_map(|key| self.payload.get(*key).and_then(parse_id))
        })
    }
}

impl DomainEvent for EventEnvelope {
    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn reference_id(&self) -> Option<&str> {
        self.reference_id.as_deref()
    }

    fn payload(&self) -> Option<&Map<String, Value>> {
        Some(&self.payload)
    }

    fn as_notifiable(&self) -> Option<&dyn Notifiable> {
        match self.payload.get("channel") {
            Some(Value::String(_)) => Some(self),
            _ => None,
        }
    }
}

impl Notifiable for EventEnvelope {
    fn channel(&self) -> &str {
        self.payload_str(&["channel"])
    }

    fn message_kind(&self) -> &str {
        self.payload_str(&["message_type", "email_type", "kind"])
    }

    fn recipient(&self) -> &str {
        self.payload_str(&["recipient", "to"])
    }

    fn notification_payload(&self) -> Map<String, Value> {
        self.payload.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_envelope_builder() {
        let envelope = EventEnvelope::builder("QuotationGenerated")
            .field("amount", 500)
            .priority(2)
            .reference_id("quotation_42")
            .customer_id(9)
            .build();

        assert_eq!(envelope.event_type(), "QuotationGenerated");
        assert_eq!(envelope.priority(), 2);
        assert_eq!(envelope.reference_id(), Some("quotation_42"));
        assert_eq!(envelope.customer_id(), Some(9));
        assert_eq!(envelope.payload().get("amount"), Some(&json!(500)));
    }

    #[test]
    fn test_default_priority() {
        let envelope = EventEnvelope::new("CustomerRegistered", Map::new());
        assert_eq!(envelope.priority(), DEFAULT_PRIORITY);
    }

    #[test]
    fn test_out_of_range_priority_is_kept() {
        let envelope = EventEnvelope::builder("Anything").priority(42).build();
        assert_eq!(envelope.priority(), 42);
    }

    #[test]
    fn test_follow_on_keeps_correlation_and_original() {
        let original = EventEnvelope::builder("QuotationGenerated")
            .priority(3)
            .reference_id("quotation_42")
            .customer_id(9)
            .build();
        let before = original.clone();

        let next = original.follow_on("EmailQueued", payload(json!({"email_type": "quotation"})));

        assert_eq!(original, before);
        assert_eq!(next.event_type(), "EmailQueued");
        assert_eq!(next.priority(), 3);
        assert_eq!(next.reference_id(), Some("quotation_42"));
        assert_eq!(next.customer_id(), Some(9));
    }

    #[test]
    fn test_deserialize_minimal_envelope() {
        let envelope: EventEnvelope = serde_json::from_str(
            r#"{"type": "PolicyRenewed", "payload": {"renewedPolicy": {"id": 11}}, "referenceId": "policy_11"}"#,
        )
        .unwrap();

        assert_eq!(envelope.event_type(), "PolicyRenewed");
        assert_eq!(envelope.priority(), DEFAULT_PRIORITY);
        assert_eq!(envelope.reference_id(), Some("policy_11"));
    }

    #[test]
    fn test_references_from_payload() {
        let envelope = EventEnvelope::new(
            "PolicyRenewed",
            payload(json!({
                "originalPolicy": {"id": 10},
                "renewedPolicy": {"id": 11},
                "customer_id": "4"
            })),
        );

        assert_eq!(
            envelope.renewal(),
            Some((EntityRef::new(10), EntityRef::new(11)))
        );
        assert_eq!(envelope.customer_id(), Some(4));
        assert_eq!(EventReferences::customer_id(&envelope), Some(4));
        assert!(envelope.customer().is_none());
    }

    #[test]
    fn test_renewal_requires_both_policies() {
        let envelope = EventEnvelope::new(
            "PolicyRenewed",
            payload(json!({"renewedPolicy": {"id": 11}})),
        );
        assert!(envelope.renewal().is_none());
    }

    #[test]
    fn test_notifiable_only_with_channel() {
        let plain = EventEnvelope::new("CustomerRegistered", Map::new());
        assert!(plain.as_notifiable().is_none());

        let email = EventEnvelope::new(
            "EmailQueued",
            payload(json!({"channel": "email", "email_type": "welcome", "recipient": "a@b.c"})),
        );
        let notifiable = email.as_notifiable().unwrap();
        assert_eq!(notifiable.channel(), "email");
        assert_eq!(notifiable.message_kind(), "welcome");
        assert_eq!(notifiable.recipient(), "a@b.c");
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::event::{DomainEvent, EventReferences, Notifiable, DEFAULT_PRIORITY};

/// "From" identity of an outbound email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenderIdentity {
    pub name: String,
    pub address: String,
}

/// An email was requested and waits for the mail transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailQueued {
    /// e.g. `"welcome"`, `"password_reset"`, `"policy_document"`
    pub email_type: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    /// Unset means the configured default sender.
    pub sender: Option<SenderIdentity>,
    pub priority: i32,
    pub reference_id: Option<String>,
    pub customer_id: Option<i64>,
    pub queued_at: DateTime<Utc>,
}

impl EmailQueued {
    pub fn new(
        email_type: impl Into<String>,
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            email_type: email_type.into(),
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
            sender: None,
            priority: DEFAULT_PRIORITY,
            reference_id: None,
            customer_id: None,
            queued_at: Utc::now(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_sender(mut self, sender: SenderIdentity) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_reference_id(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn for_customer(mut self, customer_id: i64) -> Self {
        self.customer_id = Some(customer_id);
        self
    }
}

impl EventReferences for EmailQueued {
    fn customer_id(&self) -> Option<i64> {
        self.customer_id
    }
}

impl DomainEvent for EmailQueued {
    fn event_type(&self) -> &str {
        "EmailQueued"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn reference_id(&self) -> Option<&str> {
        self.reference_id.as_deref()
    }

    /// Audit view: the body is reduced to its length.
    fn export_fields(&self) -> Option<Map<String, Value>> {
        let exported = json!({
            "email_type": self.email_type,
            "recipient": self.recipient,
            "subject": self.subject,
            "body_length": self.body.chars().count(),
            "priority": self.priority,
            "reference_id": self.reference_id,
            "customer_id": self.customer_id,
            "queued_at": self.queued_at.to_rfc3339(),
        });
        exported.as_object().cloned()
    }

    fn as_notifiable(&self) -> Option<&dyn Notifiable> {
        Some(self)
    }
}

impl Notifiable for EmailQueued {
    fn channel(&self) -> &str {
        "email"
    }

    fn message_kind(&self) -> &str {
        &self.email_type
    }

    fn recipient(&self) -> &str {
        &self.recipient
    }

    fn notification_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("subject".into(), Value::from(self.subject.clone()));
        payload.insert("body".into(), Value::from(self.body.clone()));
        if let Some(sender) = &self.sender {
            payload.insert("sender".into(), json!(sender));
        }
        payload
    }
}

/// A WhatsApp message was requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppMessageQueued {
    /// e.g. `"otp"`, `"renewal_reminder"`
    pub message_type: String,
    /// Phone number in E.164 form
    pub recipient: String,
    pub body: String,
    pub priority: i32,
    pub reference_id: Option<String>,
    pub customer_id: Option<i64>,
}

impl WhatsAppMessageQueued {
    pub fn new(
        message_type: impl Into<String>,
        recipient: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            message_type: message_type.into(),
            recipient: recipient.into(),
            body: body.into(),
            priority: DEFAULT_PRIORITY,
            reference_id: None,
            customer_id: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_reference_id(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn for_customer(mut self, customer_id: i64) -> Self {
        self.customer_id = Some(customer_id);
        self
    }
}

impl EventReferences for WhatsAppMessageQueued {
    fn customer_id(&self) -> Option<i64> {
        self.customer_id
    }
}

impl DomainEvent for WhatsAppMessageQueued {
    fn event_type(&self) -> &str {
        "WhatsAppMessageQueued"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn reference_id(&self) -> Option<&str> {
        self.reference_id.as_deref()
    }

    fn as_notifiable(&self) -> Option<&dyn Notifiable> {
        Some(self)
    }
}

impl Notifiable for WhatsAppMessageQueued {
    fn channel(&self) -> &str {
        "whatsapp"
    }

    fn message_kind(&self) -> &str {
        &self.message_type
    }

    fn recipient(&self) -> &str {
        &self.recipient
    }

    fn notification_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("body".into(), Value::from(self.body.clone()));
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_export_redacts_body() {
        let email = EmailQueued::new("welcome", "a@example.com", "Welcome", "secret body")
            .for_customer(3)
            .with_reference_id("customer_3");

        let exported = email.export_fields().unwrap();

        assert!(!exported.contains_key("body"));
        assert_eq!(exported["body_length"], json!(11));
        assert_eq!(exported["customer_id"], json!(3));
        assert!(exported.contains_key("queued_at"));
    }

    #[test]
    fn test_whatsapp_has_no_structured_export() {
        let message = WhatsAppMessageQueued::new("otp", "+911234567890", "Your code is 1234");
        assert!(message.export_fields().is_none());
        assert_eq!(message.as_notifiable().map(|n| n.channel()), Some("whatsapp"));
    }
}

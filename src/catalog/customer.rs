use serde::{Deserialize, Serialize};

use crate::event::{DomainEvent, EntityRef, EventReferences};

/// Customer fields captured at the time of the event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
}

impl CustomerSnapshot {
    pub fn new(id: i64, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            mobile: None,
        }
    }

    pub fn with_mobile(mut self, mobile: impl Into<String>) -> Self {
        self.mobile = Some(mobile.into());
        self
    }
}

/// A customer completed registration.
///
/// `connection` and `queue` name the transport the producer wants this
/// event handled on; they are routing bookkeeping, not event data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRegistered {
    pub customer: CustomerSnapshot,
    /// Where the registration happened, e.g. `"portal"` or `"admin"`.
    pub source: String,
    #[serde(default)]
    pub connection: Option<String>,
    #[serde(default)]
    pub queue: Option<String>,
}

impl CustomerRegistered {
    pub fn new(customer: CustomerSnapshot, source: impl Into<String>) -> Self {
        Self {
            customer,
            source: source.into(),
            connection: None,
            queue: None,
        }
    }

    pub fn on_queue(mut self, connection: impl Into<String>, queue: impl Into<String>) -> Self {
        self.connection = Some(connection.into());
        self.queue = Some(queue.into());
        self
    }
}

impl EventReferences for CustomerRegistered {
    fn customer(&self) -> Option<EntityRef> {
        Some(EntityRef::new(self.customer.id))
    }

    fn customer_id(&self) -> Option<i64> {
        Some(self.customer.id)
    }
}

impl DomainEvent for CustomerRegistered {
    fn event_type(&self) -> &str {
        "CustomerRegistered"
    }
}

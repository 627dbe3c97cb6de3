use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::event::{DomainEvent, EntityRef, EventReferences, Notifiable, DEFAULT_PRIORITY};

/// Customer insurance policy fields captured at the time of the event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub id: i64,
    pub policy_number: String,
    pub expires_on: NaiveDate,
}

/// A policy reached one of the configured renewal reminder offsets.
///
/// With a customer mobile number the reminder also goes out as a WhatsApp
/// `renewal_reminder`; without one it is only recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyExpiringSoon {
    pub policy: PolicySnapshot,
    pub customer_id: i64,
    pub days_remaining: u32,
    #[serde(default)]
    pub customer_mobile: Option<String>,
}

impl EventReferences for PolicyExpiringSoon {
    fn policy(&self) -> Option<EntityRef> {
        Some(EntityRef::new(self.policy.id))
    }

    fn customer_id(&self) -> Option<i64> {
        Some(self.customer_id)
    }
}

impl DomainEvent for PolicyExpiringSoon {
    fn event_type(&self) -> &str {
        "PolicyExpiringSoon"
    }

    fn priority(&self) -> i32 {
        // the last week before expiry is urgent
        if self.days_remaining <= 7 {
            2
        } else {
            DEFAULT_PRIORITY
        }
    }

    fn as_notifiable(&self) -> Option<&dyn Notifiable> {
        match self.customer_mobile.as_deref() {
            Some(mobile) if !mobile.trim().is_empty() => Some(self),
            _ => None,
        }
    }
}

impl Notifiable for PolicyExpiringSoon {
    fn channel(&self) -> &str {
        "whatsapp"
    }

    fn message_kind(&self) -> &str {
        "renewal_reminder"
    }

    fn recipient(&self) -> &str {
        self.customer_mobile.as_deref().unwrap_or_default()
    }

    fn notification_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("policy_number".into(), Value::from(self.policy.policy_number.clone()));
        payload.insert("expires_on".into(), Value::from(self.policy.expires_on.to_string()));
        payload.insert("days_remaining".into(), Value::from(self.days_remaining));
        payload
    }
}

/// An existing policy was renewed into a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRenewed {
    pub original_policy: PolicySnapshot,
    pub renewed_policy: PolicySnapshot,
    pub customer_id: i64,
}

impl EventReferences for PolicyRenewed {
    fn renewal(&self) -> Option<(EntityRef, EntityRef)> {
        Some((
            EntityRef::new(self.original_policy.id),
            EntityRef::new(self.renewed_policy.id),
        ))
    }

    fn customer_id(&self) -> Option<i64> {
        Some(self.customer_id)
    }
}

impl DomainEvent for PolicyRenewed {
    fn event_type(&self) -> &str {
        "PolicyRenewed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reminder(customer_mobile: Option<&str>) -> PolicyExpiringSoon {
        PolicyExpiringSoon {
            policy: PolicySnapshot {
                id: 5,
                policy_number: "POL-5".into(),
                expires_on: NaiveDate::from_ymd_opt(2026, 3, 8).unwrap(),
            },
            customer_id: 105,
            days_remaining: 7,
            customer_mobile: customer_mobile.map(str::to_string),
        }
    }

    #[test]
    fn test_reminder_with_mobile_is_notifiable() {
        let event = reminder(Some("+15550100"));
        let notifiable = event.as_notifiable().unwrap();

        assert_eq!(notifiable.channel(), "whatsapp");
        assert_eq!(notifiable.message_kind(), "renewal_reminder");
        assert_eq!(notifiable.recipient(), "+15550100");
        assert_eq!(notifiable.notification_payload()["expires_on"], "2026-03-08");
        assert_eq!(event.priority(), 2);
    }

    #[test]
    fn test_reminder_without_mobile_is_record_only() {
        assert!(reminder(None).as_notifiable().is_none());
        assert!(reminder(Some("  ")).as_notifiable().is_none());
    }
}

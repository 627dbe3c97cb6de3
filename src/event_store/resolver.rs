//! Aggregate attribution.
//!
//! Rules are evaluated in a fixed order and the first match wins. The order
//! encodes domain precedence: a renewal is about the new policy, and a full
//! entity reference beats a bare `customer_id` scalar.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::event::EventReferences;

/// Business entity an event store record is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateType {
    Customer,
    Quotation,
    CustomerInsurance,
}

impl AggregateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateType::Customer => "Customer",
            AggregateType::Quotation => "Quotation",
            AggregateType::CustomerInsurance => "CustomerInsurance",
        }
    }
}

impl fmt::Display for AggregateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregateType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Customer" => Ok(AggregateType::Customer),
            "Quotation" => Ok(AggregateType::Quotation),
            "CustomerInsurance" => Ok(AggregateType::CustomerInsurance),
            other => Err(format!("unknown aggregate type: {}", other)),
        }
    }
}

/// Aggregate type and id of an attributed event.
///
/// The id is the string encoding of the source id, so a record stays valid
/// after the referenced entity is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribution {
    pub aggregate_type: AggregateType,
    pub aggregate_id: String,
}

impl Attribution {
    pub fn new(aggregate_type: AggregateType, id: i64) -> Self {
        Self {
            aggregate_type,
            aggregate_id: id.to_string(),
        }
    }
}

/// First-match rule chain over an event's references.
///
/// Order: `customer`, `quotation`, `policy`, `renewal` (attributed to the
/// renewed policy), then the bare `customer_id` scalar. Changing the order
/// changes attribution of events that satisfy several rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateResolver;

impl AggregateResolver {
    pub fn new() -> Self {
        Self
    }

    /// `None` means unattributed, which is a valid outcome.
    pub fn resolve<E: EventReferences + ?Sized>(&self, refs: &E) -> Option<Attribution> {
        self.resolve_with_rule(refs).map(|(_, attribution)| attribution)
    }

    /// Like [`resolve`](Self::resolve), also naming the rule that matched.
    pub fn resolve_with_rule<E: EventReferences + ?Sized>(
        &self,
        refs: &E,
    ) -> Option<(&'static str, Attribution)> {
        use AggregateType::*;

        refs.customer()
            .map(|c| ("customer", Attribution::new(Customer, c.id)))
            .or_else(|| {
                refs.quotation()
                    .map(|q| ("quotation", Attribution::new(Quotation, q.id)))
            })
            .or_else(|| {
                refs.policy()
                    .map(|p| ("policy", Attribution::new(CustomerInsurance, p.id)))
            })
            .or_else(|| {
                refs.renewal().map(|(_original, renewed)| {
                    ("renewal", Attribution::new(CustomerInsurance, renewed.id))
                })
            })
            .or_else(|| {
                refs.customer_id()
                    .map(|id| ("customer_id", Attribution::new(Customer, id)))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EntityRef, EventEnvelope};
    use serde_json::{json, Value};

    fn envelope(payload: Value) -> EventEnvelope {
        EventEnvelope::new("Test", payload.as_object().cloned().unwrap())
    }

    #[test]
    fn test_customer_reference() {
        let event = envelope(json!({"customer": {"id": 5}}));
        assert_eq!(
            AggregateResolver.resolve(&event),
            Some(Attribution::new(AggregateType::Customer, 5))
        );
    }

    #[test]
    fn test_quotation_beats_customer_id() {
        let event = envelope(json!({"quotation": {"id": 42}, "customerId": 7}));
        let (rule, attribution) = AggregateResolver.resolve_with_rule(&event).unwrap();

        assert_eq!(rule, "quotation");
        assert_eq!(attribution.aggregate_type, AggregateType::Quotation);
        assert_eq!(attribution.aggregate_id, "42");
    }

    #[test]
    fn test_customer_beats_quotation() {
        let event = envelope(json!({"customer": {"id": 1}, "quotation": {"id": 2}}));
        assert_eq!(
            AggregateResolver.resolve(&event).unwrap().aggregate_type,
            AggregateType::Customer
        );
    }

    #[test]
    fn test_policy_reference() {
        let event = envelope(json!({"policy": {"id": 77}, "customer_id": 3}));
        assert_eq!(
            AggregateResolver.resolve(&event),
            Some(Attribution::new(AggregateType::CustomerInsurance, 77))
        );
    }

    #[test]
    fn test_renewal_uses_renewed_policy() {
        let event = envelope(json!({
            "originalPolicy": {"id": 10},
            "renewedPolicy": {"id": 11},
            "customerId": 99
        }));
        let attribution = AggregateResolver.resolve(&event).unwrap();

        assert_eq!(attribution.aggregate_type, AggregateType::CustomerInsurance);
        assert_eq!(attribution.aggregate_id, "11");
    }

    #[test]
    fn test_half_renewal_falls_through() {
        let event = envelope(json!({"renewedPolicy": {"id": 11}, "customerId": 99}));
        assert_eq!(
            AggregateResolver.resolve(&event),
            Some(Attribution::new(AggregateType::Customer, 99))
        );
    }

    #[test]
    fn test_null_customer_id_is_unattributed() {
        let event = envelope(json!({"customerId": null, "amount": 5}));
        assert_eq!(AggregateResolver.resolve(&event), None);
    }

    #[test]
    fn test_empty_payload_is_unattributed() {
        let event = envelope(json!({}));
        assert_eq!(AggregateResolver.resolve(&event), None);
    }

    struct OnlyRenewal;

    impl EventReferences for OnlyRenewal {
        fn renewal(&self) -> Option<(EntityRef, EntityRef)> {
            Some((EntityRef::new(1), EntityRef::new(2)))
        }
    }

    #[test]
    fn test_works_on_any_reference_accessor() {
        assert_eq!(
            AggregateResolver.resolve(&OnlyRenewal),
            Some(Attribution::new(AggregateType::CustomerInsurance, 2))
        );
    }

    #[test]
    fn test_aggregate_type_round_trip_names() {
        for t in [
            AggregateType::Customer,
            AggregateType::Quotation,
            AggregateType::CustomerInsurance,
        ] {
            assert_eq!(t.as_str().parse::<AggregateType>(), Ok(t));
        }
        assert!("Order".parse::<AggregateType>().is_err());
    }
}

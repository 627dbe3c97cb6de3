use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity of a business entity referenced by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: i64,
}

impl EntityRef {
    pub fn new(id: i64) -> Self {
        Self { id }
    }

    /// Read a reference out of a payload value.
    ///
    /// Accepts an object carrying an `id` (number or numeric string).
    /// Anything else, including `null`, is not a reference.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = value.as_object()?.get("id")?;
        parse_id(id).map(Self::new)
    }
}

/// Parse a scalar id that may have been encoded as a number or a string.
pub(crate) fn parse_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reference accessor capability.
///
/// Every method defaults to "not carried", so an event kind only overrides
/// the references it actually has. Aggregate attribution is derived from
/// these accessors alone.
pub trait EventReferences {
    /// The customer this event is about.
    fn customer(&self) -> Option<EntityRef> {
        None
    }

    fn quotation(&self) -> Option<EntityRef> {
        None
    }

    fn policy(&self) -> Option<EntityRef> {
        None
    }

    /// `(original, renewed)` policy pair of a renewal.
    fn renewal(&self) -> Option<(EntityRef, EntityRef)> {
        None
    }

    /// Bare customer id scalar, for customer-scoped events that do not
    /// carry the full customer reference.
    fn customer_id(&self) -> Option<i64> {
        None
    }
}

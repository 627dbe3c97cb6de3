use serde::{Deserialize, Serialize};

use crate::event::{DomainEvent, EntityRef, EventReferences};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotationSnapshot {
    pub id: i64,
    pub quotation_number: String,
    pub total_premium: f64,
}

/// A quotation was generated for a customer.
#[derive(Debug, Clone, Serialize)]
pub struct QuotationGenerated {
    pub quotation: QuotationSnapshot,
    pub customer_id: i64,
    #[serde(skip)]
    reference_id: String,
}

impl QuotationGenerated {
    pub fn new(quotation: QuotationSnapshot, customer_id: i64) -> Self {
        let reference_id = format!("quotation_{}", quotation.id);
        Self {
            quotation,
            customer_id,
            reference_id,
        }
    }
}

impl EventReferences for QuotationGenerated {
    fn quotation(&self) -> Option<EntityRef> {
        Some(EntityRef::new(self.quotation.id))
    }

    fn customer_id(&self) -> Option<i64> {
        Some(self.customer_id)
    }
}

impl DomainEvent for QuotationGenerated {
    fn event_type(&self) -> &str {
        "QuotationGenerated"
    }

    fn priority(&self) -> i32 {
        3
    }

    fn reference_id(&self) -> Option<&str> {
        Some(&self.reference_id)
    }
}

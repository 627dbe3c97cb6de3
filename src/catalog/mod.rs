//! Concrete domain events raised by the CRM.
//!
//! Entity snapshots carry the identity plus the few fields a listener needs
//! at dispatch time; they are copies, never live handles to the records.

mod communication;
mod customer;
mod policy;
mod quotation;

pub use communication::{EmailQueued, SenderIdentity, WhatsAppMessageQueued};
pub use customer::{CustomerRegistered, CustomerSnapshot};
pub use policy::{PolicyExpiringSoon, PolicyRenewed, PolicySnapshot};
pub use quotation::{QuotationGenerated, QuotationSnapshot};

/// Event types raised by this catalog.
///
/// Metrics label dispatched events with these names only; anything else
/// arriving over the triggers is counted as `other`.
pub const EVENT_TYPES: &[&str] = &[
    "CustomerRegistered",
    "QuotationGenerated",
    "PolicyExpiringSoon",
    "PolicyRenewed",
    "EmailQueued",
    "WhatsAppMessageQueued",
];

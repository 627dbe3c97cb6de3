mod renewal;

pub use renewal::{reminder_offset_due, ExpiringPolicy, PolicyExpirySource, RenewalReminderTask};

//! Delivery lane classification.
//!
//! A lane is `<family>-priority` or `<family>-normal`. An event is high
//! priority when its numeric priority is 3 or better, or when its message
//! kind is time-sensitive for its channel family regardless of priority.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metrics::LANE_FALLBACK_TOTAL;

/// Priorities at or below this value are always high priority.
pub const HIGH_PRIORITY_THRESHOLD: i32 = 3;

/// Lane used when the channel family is not recognised.
pub const DEFAULT_LANE: &str = "default";

/// Communication channel family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    WhatsApp,
    Sms,
}

impl Channel {
    /// Parse a channel name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "email" | "mail" => Some(Channel::Email),
            "whatsapp" | "whats_app" => Some(Channel::WhatsApp),
            "sms" => Some(Channel::Sms),
            _ => None,
        }
    }

    /// Lane name prefix
    pub fn family(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::WhatsApp => "whatsapp",
            Channel::Sms => "sms",
        }
    }

    /// Message kinds that always go to the priority lane.
    pub fn time_sensitive_kinds(&self) -> &'static [&'static str] {
        match self {
            Channel::Email => &[
                "verification",
                "email_verification",
                "password_reset",
                "policy_document",
                "quotation",
            ],
            Channel::WhatsApp => &["otp", "policy_document", "quotation"],
            Channel::Sms => &["otp", "verification"],
        }
    }

    pub fn is_time_sensitive(&self, kind: &str) -> bool {
        self.time_sensitive_kinds().contains(&kind)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.family())
    }
}

/// Named logical delivery channel, e.g. `email-priority`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueLane(String);

impl QueueLane {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn priority(channel: Channel) -> Self {
        Self(format!("{}-priority", channel.family()))
    }

    pub fn normal(channel: Channel) -> Self {
        Self(format!("{}-normal", channel.family()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueLane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `priority <= 3 || time_sensitive`
pub fn is_high_priority(priority: i32, time_sensitive: bool) -> bool {
    priority <= HIGH_PRIORITY_THRESHOLD || time_sensitive
}

/// Maps channel, message kind and priority to a lane.
///
/// Holds only the configured fallback lane; safe to share across tasks.
#[derive(Debug, Clone)]
pub struct LaneClassifier {
    default_lane: QueueLane,
}

impl LaneClassifier {
    pub fn new(default_lane: impl Into<String>) -> Self {
        Self {
            default_lane: QueueLane::new(default_lane),
        }
    }

    pub fn default_lane(&self) -> &QueueLane {
        &self.default_lane
    }

    /// Whether the message would take the priority lane of its family.
    ///
    /// Unknown channels have no time-sensitive kinds.
    pub fn is_high_priority(&self, channel: &str, kind: &str, priority: i32) -> bool {
        let time_sensitive = Channel::parse(channel)
            .map(|c| c.is_time_sensitive(kind))
            .unwrap_or(false);
        is_high_priority(priority, time_sensitive)
    }

    /// Resolve the delivery lane. Never fails: unknown channel families are
    /// routed to the default lane.
    pub fn classify(&self, channel: &str, kind: &str, priority: i32) -> QueueLane {
        let Some(family) = Channel::parse(channel) else {
            LANE_FALLBACK_TOTAL.inc();
            tracing::warn!(
                channel = %channel,
                kind = %kind,
                lane = %self.default_lane,
                "Unknown channel family, routing to default lane"
            );
            return self.default_lane.clone();
        };

        if is_high_priority(priority, family.is_time_sensitive(kind)) {
            QueueLane::priority(family)
        } else {
            QueueLane::normal(family)
        }
    }
}

impl Default for LaneClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_LANE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_priority_formula() {
        for priority in -2..=12 {
            for time_sensitive in [true, false] {
                assert_eq!(
                    is_high_priority(priority, time_sensitive),
                    priority <= 3 || time_sensitive
                );
            }
        }
    }

    #[test]
    fn test_time_sensitive_overrides_priority() {
        let classifier = LaneClassifier::default();

        assert!(classifier.is_high_priority("email", "password_reset", 5));
        assert!(classifier.is_high_priority("email", "welcome", 2));
        assert!(!classifier.is_high_priority("email", "welcome", 7));
    }

    #[test]
    fn test_email_lanes() {
        let classifier = LaneClassifier::default();

        assert_eq!(classifier.classify("email", "quotation", 9).as_str(), "email-priority");
        assert_eq!(classifier.classify("email", "welcome", 3).as_str(), "email-priority");
        assert_eq!(classifier.classify("email", "welcome", 4).as_str(), "email-normal");
    }

    #[test]
    fn test_whatsapp_lanes() {
        let classifier = LaneClassifier::default();

        assert_eq!(classifier.classify("WhatsApp", "otp", 8).as_str(), "whatsapp-priority");
        assert_eq!(
            classifier.classify("whatsapp", "renewal_reminder", 5).as_str(),
            "whatsapp-normal"
        );
    }

    #[test]
    fn test_time_sensitive_sets_are_per_family() {
        // password_reset is only time-sensitive for email
        let classifier = LaneClassifier::default();
        assert_eq!(
            classifier.classify("whatsapp", "password_reset", 6).as_str(),
            "whatsapp-normal"
        );
    }

    #[test]
    fn test_unknown_channel_fails_closed() {
        let classifier = LaneClassifier::new("fallback");

        assert_eq!(classifier.classify("pigeon", "quotation", 1).as_str(), "fallback");
        assert!(classifier.is_high_priority("pigeon", "quotation", 1));
        assert!(!classifier.is_high_priority("pigeon", "quotation", 6));
    }

    #[test]
    fn test_out_of_range_priority_not_clamped() {
        let classifier = LaneClassifier::default();

        assert_eq!(classifier.classify("sms", "notice", -4).as_str(), "sms-priority");
        assert_eq!(classifier.classify("sms", "notice", 99).as_str(), "sms-normal");
    }
}

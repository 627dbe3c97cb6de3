//! Listeners wired by the service.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use uuid::Uuid;

use crate::config::{NotificationSettings, SenderSettings};
use crate::event::DomainEvent;
use crate::event_store::{AggregateResolver, EventDataExtractor, EventStoreWriter};
use crate::metrics::NOTIFICATIONS_SUPPRESSED_TOTAL;
use crate::queue::{Channel, LaneClassifier, LaneJob, LaneQueueBackend};
use crate::telemetry::attributes;

use super::listener::{Listener, ListenerError};

/// Records every dispatched event in the event store.
pub struct EventStoreListener {
    resolver: AggregateResolver,
    extractor: EventDataExtractor,
    writer: EventStoreWriter,
}

impl EventStoreListener {
    pub fn new(writer: EventStoreWriter) -> Self {
        Self {
            resolver: AggregateResolver::new(),
            extractor: EventDataExtractor::new(),
            writer,
        }
    }
}

#[async_trait]
impl Listener for EventStoreListener {
    fn name(&self) -> &str {
        "event_store"
    }

    async fn handle(&self, event: &dyn DomainEvent) -> Result<(), ListenerError> {
        let attribution = match self.resolver.resolve_with_rule(event) {
            Some((rule, attribution)) => {
                tracing::trace!(
                    event_type = %event.event_type(),
                    rule = rule,
                    aggregate_type = %attribution.aggregate_type,
                    aggregate_id = %attribution.aggregate_id,
                    "Event attributed"
                );
                Some(attribution)
            }
            None => {
                tracing::debug!(event_type = %event.event_type(), "Event has no aggregate, storing unattributed");
                None
            }
        };

        let event_data = self.extractor.extract(event);
        self.writer
            .store(event.event_type(), event_data, attribution)
            .await?;

        Ok(())
    }
}

/// Routes outbound communication requests onto delivery lanes.
///
/// Only events exposing [`Notifiable`](crate::event::Notifiable) produce a
/// job. Channels switched off in configuration complete without one.
pub struct NotificationListener {
    lanes: Arc<dyn LaneQueueBackend>,
    classifier: LaneClassifier,
    notifications: NotificationSettings,
    sender: SenderSettings,
}

impl NotificationListener {
    pub fn new(
        lanes: Arc<dyn LaneQueueBackend>,
        classifier: LaneClassifier,
        notifications: NotificationSettings,
        sender: SenderSettings,
    ) -> Self {
        Self {
            lanes,
            classifier,
            notifications,
            sender,
        }
    }
}

#[async_trait]
impl Listener for NotificationListener {
    fn name(&self) -> &str {
        "notification"
    }

    async fn handle(&self, event: &dyn DomainEvent) -> Result<(), ListenerError> {
        let Some(notifiable) = event.as_notifiable() else {
            return Ok(());
        };

        let channel_name = notifiable.channel();
        let channel = Channel::parse(channel_name);
        if let Some(channel) = channel {
            if !self.notifications.is_enabled(channel) {
                NOTIFICATIONS_SUPPRESSED_TOTAL
                    .with_label_values(&[channel.family()])
                    .inc();
                tracing::debug!(
                    channel = %channel,
                    event_type = %event.event_type(),
                    "Channel disabled, notification not queued"
                );
                return Ok(());
            }
        }

        let recipient = notifiable.recipient();
        if recipient.is_empty() {
            return Err(ListenerError::Rejected(format!(
                "{} notification without recipient",
                channel_name
            )));
        }

        let kind = notifiable.message_kind();
        let lane = self.classifier.classify(channel_name, kind, event.priority());
        let attribute = attributes::lane(lane.as_str());
        tracing::Span::current().set_attribute(attribute.key, attribute.value);

        let mut payload = notifiable.notification_payload();
        if channel == Some(Channel::Email) && !payload.contains_key("sender") {
            payload.insert(
                "sender".to_string(),
                json!({"name": self.sender.name, "address": self.sender.address}),
            );
        }

        let job = LaneJob {
            id: Uuid::new_v4(),
            lane: lane.clone(),
            event_type: event.event_type().to_string(),
            channel: channel.map(|c| c.family().to_string()).unwrap_or_else(|| channel_name.to_string()),
            kind: kind.to_string(),
            recipient: recipient.to_string(),
            priority: event.priority(),
            reference_id: event.reference_id().map(str::to_string),
            customer_id: event.customer_id(),
            payload,
            enqueued_at: Utc::now(),
        };

        tracing::debug!(
            lane = %lane,
            job_id = %job.id,
            event_type = %job.event_type,
            reference_id = ?job.reference_id,
            "Notification routed"
        );

        self.lanes.enqueue(job).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EmailQueued, SenderIdentity, WhatsAppMessageQueued};
    use crate::event::EventEnvelope;
    use crate::event_store::{AggregateType, EventStoreBackend, MemoryEventStore};
    use crate::queue::{MemoryLaneQueue, QueueLane};
    use serde_json::{Map, Value};

    fn sender_of(payload: &Map<String, Value>) -> Option<(&str, &str)> {
        let sender = payload.get("sender")?;
        Some((sender.get("name")?.as_str()?, sender.get("address")?.as_str()?))
    }

    fn notification_listener(
        lanes: Arc<MemoryLaneQueue>,
        notifications: NotificationSettings,
    ) -> NotificationListener {
        NotificationListener::new(
            lanes,
            LaneClassifier::default(),
            notifications,
            SenderSettings {
                name: "Acme Insurance".into(),
                address: "hello@acme.test".into(),
            },
        )
    }

    #[tokio::test]
    async fn test_event_store_listener_attributes_and_extracts() {
        let store = Arc::new(MemoryEventStore::new());
        let listener = EventStoreListener::new(EventStoreWriter::new(store.clone()));

        let payload = json!({"quotation": {"id": 42}, "customerId": 7, "queue": "x"});
        let event = EventEnvelope::new("QuotationSent", payload.as_object().cloned().unwrap());
        listener.handle(&event).await.unwrap();

        let records = store.events_for_aggregate(AggregateType::Quotation, "42").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_name, "QuotationSent");
        assert!(!records[0].event_data.contains_key("queue"));
    }

    #[tokio::test]
    async fn test_time_sensitive_email_goes_to_priority_lane() {
        let lanes = Arc::new(MemoryLaneQueue::new());
        let listener = notification_listener(lanes.clone(), NotificationSettings::default());

        let event = EmailQueued::new("password_reset", "ana@example.com", "Reset", "Link")
            .with_priority(8)
            .with_reference_id("customer_9");
        listener.handle(&event).await.unwrap();

        let job = lanes
            .pop(&QueueLane::new("email-priority"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.reference_id.as_deref(), Some("customer_9"));
        assert_eq!(sender_of(&job.payload), Some(("Acme Insurance", "hello@acme.test")));
    }

    #[tokio::test]
    async fn test_explicit_sender_is_kept() {
        let lanes = Arc::new(MemoryLaneQueue::new());
        let listener = notification_listener(lanes.clone(), NotificationSettings::default());

        let event = EmailQueued::new("welcome", "ana@example.com", "Hi", "Body").with_sender(
            SenderIdentity {
                name: "Agent Smith".into(),
                address: "smith@acme.test".into(),
            },
        );
        listener.handle(&event).await.unwrap();

        let job = lanes.pop(&QueueLane::new("email-normal")).await.unwrap().unwrap();
        assert_eq!(sender_of(&job.payload), Some(("Agent Smith", "smith@acme.test")));
    }

    #[tokio::test]
    async fn test_disabled_channel_skips_enqueue() {
        let lanes = Arc::new(MemoryLaneQueue::new());
        let listener = notification_listener(
            lanes.clone(),
            NotificationSettings {
                whatsapp_enabled: false,
                ..NotificationSettings::default()
            },
        );

        let event = WhatsAppMessageQueued::new("otp", "+15550001", "123456");
        listener.handle(&event).await.unwrap();

        assert_eq!(lanes.stats().await.total_jobs, 0);
    }

    #[tokio::test]
    async fn test_unknown_channel_uses_default_lane() {
        let lanes = Arc::new(MemoryLaneQueue::new());
        let listener = notification_listener(lanes.clone(), NotificationSettings::default());

        let payload = json!({"channel": "pager", "kind": "alert", "recipient": "ops"});
        let event = EventEnvelope::new("PagerRequested", payload.as_object().cloned().unwrap());
        listener.handle(&event).await.unwrap();

        let job = lanes.pop(&QueueLane::new("default")).await.unwrap().unwrap();
        assert_eq!(job.channel, "pager");
    }

    #[tokio::test]
    async fn test_non_notifiable_event_is_ignored() {
        let lanes = Arc::new(MemoryLaneQueue::new());
        let listener = notification_listener(lanes.clone(), NotificationSettings::default());

        listener
            .handle(&EventEnvelope::new("CustomerRegistered", Map::new()))
            .await
            .unwrap();
        assert_eq!(lanes.stats().await.total_jobs, 0);
    }

    #[tokio::test]
    async fn test_missing_recipient_is_rejected() {
        let lanes = Arc::new(MemoryLaneQueue::new());
        let listener = notification_listener(lanes, NotificationSettings::default());

        let payload = json!({"channel": "email", "kind": "welcome"});
        let event = EventEnvelope::new("EmailQueued", payload.as_object().cloned().unwrap());
        assert!(matches!(
            listener.handle(&event).await,
            Err(ListenerError::Rejected(_))
        ));
    }
}

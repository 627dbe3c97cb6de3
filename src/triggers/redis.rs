use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::broadcast;

use crate::config::RedisConfig;
use crate::dispatch::EventBus;
use crate::event::EventEnvelope;
use crate::metrics::TriggerMetrics;
use crate::redis::{ExponentialBackoff, RedisHealth};

/// Redis Pub/Sub subscriber feeding JSON event envelopes into the bus.
///
/// Messages are dispatched one at a time in arrival order. A malformed
/// message is logged and counted; it never ends the loop.
pub struct RedisEventSubscriber {
    url: String,
    channels: Vec<String>,
    bus: Arc<EventBus>,
    health: Arc<RedisHealth>,
    shutdown: broadcast::Sender<()>,
}

impl RedisEventSubscriber {
    pub fn new(
        url: impl Into<String>,
        config: &RedisConfig,
        bus: Arc<EventBus>,
        health: Arc<RedisHealth>,
    ) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            url: url.into(),
            channels: config.channels.clone(),
            bus,
            health,
            shutdown,
        }
    }

    /// Get a shutdown signal sender
    pub fn shutdown_signal(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    /// Run until a shutdown signal arrives, reconnecting with backoff.
    pub async fn start(&self) -> anyhow::Result<()> {
        if self.channels.is_empty() {
            tracing::info!("No Redis channels configured, skipping Redis event subscriber");
            return Ok(());
        }

        tracing::info!(channels = ?self.channels, "Starting Redis event subscriber");

        let mut backoff = ExponentialBackoff::new();
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            match self.run_subscription_loop(&mut backoff).await {
                Ok(()) => {
                    tracing::info!("Redis event subscriber stopped gracefully");
                    break;
                }
                Err(e) => {
                    self.health.set_reconnecting();
                    let delay = backoff.next_delay();
                    tracing::error!(
                        error = %e,
                        attempt = backoff.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        "Redis subscription error, reconnecting"
                    );

                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            tracing::info!("Shutdown requested while reconnecting");
                            break;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        Ok(())
    }

    async fn run_subscription_loop(&self, backoff: &mut ExponentialBackoff) -> anyhow::Result<()> {
        let client = redis::Client::open(self.url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;

        for channel in &self.channels {
            if is_pattern(channel) {
                pubsub.psubscribe(channel).await?;
                tracing::debug!(pattern = %channel, "Subscribed to pattern");
            } else {
                pubsub.subscribe(channel).await?;
                tracing::debug!(channel = %channel, "Subscribed to channel");
            }
        }

        self.health.set_connected();
        backoff.reset();
        tracing::info!("Redis subscription established");

        let mut message_stream = pubsub.on_message();
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Received shutdown signal");
                    return Ok(());
                }
                msg = message_stream.next() => {
                    let Some(msg) = msg else {
                        anyhow::bail!("Redis message stream ended");
                    };

                    let channel = msg.get_channel_name().to_string();
                    let payload: String = match msg.get_payload() {
                        Ok(p) => p,
                        Err(e) => {
                            TriggerMetrics::record_rejected();
                            tracing::warn!(channel = %channel, error = %e, "Failed to get message payload");
                            continue;
                        }
                    };

                    self.handle_message(&channel, &payload).await;
                }
            }
        }
    }

    async fn handle_message(&self, channel: &str, payload: &str) {
        TriggerMetrics::record_received();

        let envelope = match parse_envelope(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                TriggerMetrics::record_rejected();
                tracing::warn!(
                    error = %e,
                    channel = %channel,
                    payload_len = payload.len(),
                    "Rejected malformed event envelope"
                );
                return;
            }
        };

        let report = self.bus.dispatch(&envelope).await;

        tracing::debug!(
            channel = %channel,
            event_type = %report.event_type,
            completed = report.completed(),
            failed = report.failed(),
            "Dispatched event from Redis"
        );
    }
}

fn is_pattern(channel: &str) -> bool {
    channel.contains('*') || channel.contains('?') || channel.contains('[')
}

/// Parse one Pub/Sub payload. An empty event type is rejected.
pub fn parse_envelope(payload: &str) -> anyhow::Result<EventEnvelope> {
    let envelope: EventEnvelope = serde_json::from_str(payload)?;
    if envelope.event_type().trim().is_empty() {
        anyhow::bail!("event type is empty");
    }
    Ok(envelope)
}

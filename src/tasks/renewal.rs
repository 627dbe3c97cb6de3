use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use tokio::sync::broadcast;

use crate::catalog::{PolicyExpiringSoon, PolicySnapshot};
use crate::config::RenewalSettings;
use crate::dispatch::EventBus;

/// A policy nearing expiry, as reported by the policy system.
#[derive(Debug, Clone)]
pub struct ExpiringPolicy {
    pub policy: PolicySnapshot,
    pub customer_id: i64,
    /// WhatsApp number for the reminder; unset means record only.
    pub customer_mobile: Option<String>,
}

/// Lookup of active policies by expiry date, provided by the host system.
#[async_trait]
pub trait PolicyExpirySource: Send + Sync {
    /// Active policies whose expiry date lies in `from..=until`.
    async fn expiring_between(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> anyhow::Result<Vec<ExpiringPolicy>>;
}

/// The configured offset matching the days left until `expiry`, if any.
///
/// Already expired policies never match.
pub fn reminder_offset_due(expiry: NaiveDate, today: NaiveDate, offsets: &[u32]) -> Option<u32> {
    let days = (expiry - today).num_days();
    if days < 0 {
        return None;
    }
    let days = u32::try_from(days).ok()?;
    offsets.iter().copied().find(|offset| *offset == days)
}

/// Background task raising `PolicyExpiringSoon` on reminder days.
///
/// Reminders for customers with a mobile number are routed to WhatsApp by
/// the notification listener; the rest only reach the event store.
///
/// Scans at most once per calendar day, so the scan interval only bounds
/// how late in the day reminders go out.
pub struct RenewalReminderTask {
    settings: RenewalSettings,
    source: Arc<dyn PolicyExpirySource>,
    bus: Arc<EventBus>,
    shutdown: broadcast::Receiver<()>,
}

impl RenewalReminderTask {
    pub fn new(
        settings: RenewalSettings,
        source: Arc<dyn PolicyExpirySource>,
        bus: Arc<EventBus>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            settings,
            source,
            bus,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        if !self.settings.enabled || self.settings.reminder_days.is_empty() {
            tracing::info!("Renewal reminders disabled");
            return;
        }

        let mut timer =
            tokio::time::interval(Duration::from_secs(self.settings.scan_interval_seconds.max(1)));
        let mut last_scanned: Option<NaiveDate> = None;

        tracing::info!(
            reminder_days = ?self.settings.reminder_days,
            scan_interval_secs = self.settings.scan_interval_seconds,
            "Renewal reminder task started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Renewal reminder task received shutdown signal");
                    break;
                }
                _ = timer.tick() => {
                    let today = Utc::now().date_naive();
                    if last_scanned == Some(today) {
                        continue;
                    }
                    match self.scan_once(today).await {
                        Ok(raised) => {
                            last_scanned = Some(today);
                            tracing::info!(date = %today, reminders = raised, "Renewal scan finished");
                        }
                        Err(e) => {
                            tracing::error!(date = %today, error = %e, "Renewal scan failed, retrying next tick");
                        }
                    }
                }
            }
        }

        tracing::info!("Renewal reminder task stopped");
    }

    /// Raise reminders for `today`; returns how many were dispatched.
    pub async fn scan_once(&self, today: NaiveDate) -> anyhow::Result<usize> {
        let horizon = self.settings.reminder_days.iter().copied().max().unwrap_or(0);
        let until = today
            .checked_add_days(Days::new(u64::from(horizon)))
            .unwrap_or(NaiveDate::MAX);

        let policies = self.source.expiring_between(today, until).await?;
        let mut raised = 0;

        for ExpiringPolicy {
            policy,
            customer_id,
            customer_mobile,
        } in policies
        {
            let Some(days_remaining) =
                reminder_offset_due(policy.expires_on, today, &self.settings.reminder_days)
            else {
                continue;
            };

            tracing::debug!(
                policy_id = policy.id,
                customer_id = customer_id,
                days_remaining = days_remaining,
                "Raising renewal reminder"
            );

            let event = PolicyExpiringSoon {
                policy,
                customer_id,
                days_remaining,
                customer_mobile,
            };
            self.bus.dispatch(&event).await;
            raised += 1;
        }

        Ok(raised)
    }
}

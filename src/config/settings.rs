use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use crate::queue::{Channel, DEFAULT_LANE};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub event_store: EventStoreSettings,
    #[serde(default)]
    pub lanes: LaneSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub renewal: RenewalSettings,
    #[serde(default)]
    pub sender: SenderSettings,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Unset disables the Redis trigger and the Redis lane backend
    #[serde(default)]
    pub url: Option<String>,
    /// Channels (or `*` patterns) carrying JSON event envelopes
    #[serde(default = "default_redis_channels")]
    pub channels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Unset means no Postgres pool is created
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventStoreSettings {
    /// `memory` (default) or `postgres`
    #[serde(default = "default_backend")]
    pub backend: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LaneSettings {
    /// `memory` (default) or `redis`
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_lane_prefix")]
    pub redis_prefix: String,
    /// Lane for channels outside the known families
    #[serde(default = "default_lane")]
    pub default_lane: String,
}

/// Per-channel enable flags.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationSettings {
    #[serde(default = "default_true")]
    pub email_enabled: bool,
    #[serde(default = "default_true")]
    pub whatsapp_enabled: bool,
    #[serde(default)]
    pub sms_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenewalSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Days before expiry on which a reminder is raised
    #[serde(default = "default_reminder_days")]
    pub reminder_days: Vec<u32>,
    #[serde(default = "default_scan_interval")]
    pub scan_interval_seconds: u64,
}

/// Default sender identity applied to outbound email without one.
#[derive(Debug, Clone, Deserialize)]
pub struct SenderSettings {
    #[serde(default = "default_sender_name")]
    pub name: String,
    #[serde(default = "default_sender_address")]
    pub address: String,
}

/// OpenTelemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_redis_channels() -> Vec<String> {
    vec!["domain-events".to_string()]
}

fn default_pool_size() -> u32 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_idle_timeout() -> u64 {
    600 // 10 minutes
}

fn default_backend() -> String {
    "memory".to_string()
}

fn default_lane_prefix() -> String {
    "relay:lanes".to_string()
}

fn default_lane() -> String {
    DEFAULT_LANE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_reminder_days() -> Vec<u32> {
    vec![30, 15, 7, 1]
}

fn default_scan_interval() -> u64 {
    3600 // 1 hour
}

fn default_sender_name() -> String {
    "Insurance Advisor".to_string()
}

fn default_sender_address() -> String {
    "no-reply@example.com".to_string()
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "event-relay".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // RELAY__SERVER__PORT, RELAY__EVENT_STORE__BACKEND, RELAY__RENEWAL__REMINDER_DAYS=30,7,1
            .add_source(
                Environment::with_prefix("RELAY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("redis.channels")
                    .with_list_parse_key("renewal.reminder_days"),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            channels: default_redis_channels(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: default_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
        }
    }
}

impl Default for EventStoreSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
        }
    }
}

impl Default for LaneSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            redis_prefix: default_lane_prefix(),
            default_lane: default_lane(),
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email_enabled: true,
            whatsapp_enabled: true,
            sms_enabled: false,
        }
    }
}

impl NotificationSettings {
    pub fn is_enabled(&self, channel: Channel) -> bool {
        match channel {
            Channel::Email => self.email_enabled,
            Channel::WhatsApp => self.whatsapp_enabled,
            Channel::Sms => self.sms_enabled,
        }
    }
}

impl Default for RenewalSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            reminder_days: default_reminder_days(),
            scan_interval_seconds: default_scan_interval(),
        }
    }
}

impl Default for SenderSettings {
    fn default() -> Self {
        Self {
            name: default_sender_name(),
            address: default_sender_address(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8090);
        assert_eq!(settings.event_store.backend, "memory");
        assert_eq!(settings.lanes.default_lane, "default");
        assert_eq!(settings.renewal.reminder_days, vec![30, 15, 7, 1]);
        assert!(settings.redis.url.is_none());
    }

    #[test]
    fn test_channel_enable_flags() {
        let notifications = NotificationSettings {
            whatsapp_enabled: false,
            ..NotificationSettings::default()
        };
        assert!(notifications.is_enabled(Channel::Email));
        assert!(!notifications.is_enabled(Channel::WhatsApp));
        assert!(!notifications.is_enabled(Channel::Sms));
    }

    #[test]
    fn test_partial_section_uses_field_defaults() {
        let settings: Settings = Config::builder()
            .set_override("lanes.backend", "redis")
            .unwrap()
            .set_override("renewal.reminder_days", vec![14i64, 3])
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.lanes.backend, "redis");
        assert_eq!(settings.lanes.redis_prefix, "relay:lanes");
        assert_eq!(settings.renewal.reminder_days, vec![14, 3]);
        assert!(settings.renewal.enabled);
    }
}

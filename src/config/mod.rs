mod settings;

pub use settings::{
    DatabaseConfig, EventStoreSettings, LaneSettings, NotificationSettings, OtelConfig,
    RedisConfig, RenewalSettings, SenderSettings, ServerConfig, Settings,
};

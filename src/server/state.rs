use std::sync::Arc;
use std::time::Instant;

use redis::aio::ConnectionManager;

use crate::config::Settings;
use crate::dispatch::{EventBus, EventStoreListener, NotificationListener};
use crate::event_store::{
    create_event_store, EventStoreBackend, EventStoreError, EventStoreWriter,
};
use crate::postgres::PostgresPool;
use crate::queue::{create_lane_queue, LaneClassifier, LaneQueueBackend};
use crate::redis::RedisHealth;

#[derive(Clone)]
pub struct AppState {
    pub bus: Arc<EventBus>,
    pub event_store: Arc<dyn EventStoreBackend>,
    pub lanes: Arc<dyn LaneQueueBackend>,
    pub redis_health: Arc<RedisHealth>,
    pub postgres: Option<PostgresPool>,
    pub start_time: Instant,
}

impl AppState {
    /// Build backends and the event bus from settings.
    ///
    /// A missing Redis connection makes the lane queue fall back to memory.
    /// A postgres event store without a pool is an error. With defaults,
    /// `AppState::new(&Settings::default(), None, None)` is a fully working
    /// in-process relay.
    pub fn new(
        settings: &Settings,
        postgres: Option<PostgresPool>,
        redis: Option<ConnectionManager>,
    ) -> Result<Self, EventStoreError> {
        let event_store = create_event_store(&settings.event_store, postgres.as_ref())?;
        let lanes = create_lane_queue(&settings.lanes, redis.clone());

        let redis_health = Arc::new(RedisHealth::new());
        if settings.redis.url.is_none() {
            redis_health.set_disabled();
        }

        let bus = build_bus(settings, event_store.clone(), lanes.clone());

        Ok(Self {
            bus: Arc::new(bus),
            event_store,
            lanes,
            redis_health,
            postgres,
            start_time: Instant::now(),
        })
    }
}

/// The event store listener is registered first so that a record exists
/// even when notification routing fails.
fn build_bus(
    settings: &Settings,
    event_store: Arc<dyn EventStoreBackend>,
    lanes: Arc<dyn LaneQueueBackend>,
) -> EventBus {
    let mut bus = EventBus::new();
    bus.listen_all(EventStoreListener::new(EventStoreWriter::new(event_store)))
        .listen_all(NotificationListener::new(
            lanes,
            LaneClassifier::new(settings.lanes.default_lane.clone()),
            settings.notifications.clone(),
            settings.sender.clone(),
        ));

    tracing::info!(listeners = bus.listener_count(), "Event bus ready");
    bus
}

//! Inbound event sources: Redis Pub/Sub and the HTTP publish endpoint.

mod http;
mod redis;

pub use http::{publish_event, PublishEventResponse};
pub use redis::{parse_envelope, RedisEventSubscriber};

//! SSE (Server-Sent Events) transport for live notifications
//!
//! ## Endpoints
//! - `GET /live-notification` - SSE stream of one subscriber's queue
//! - `POST /push-message` - publish to a topic or to one subscriber
//! - `GET /info` - server info and topic count

pub mod handler;

use serde::Deserialize;

use crate::fanout::{Broadcaster, DEFAULT_QUEUE_CAPACITY};

/// Shared state for SSE endpoints
pub struct SseState {
    /// Fan-out engine (and through it, the subscriber registry)
    pub broadcaster: Broadcaster,
    /// Capacity of each subscriber's queue
    pub queue_capacity: usize,
    /// Server info
    pub server_name: String,
    pub server_version: String,
}

impl SseState {
    pub fn new(broadcaster: Broadcaster, queue_capacity: usize) -> Self {
        Self {
            broadcaster,
            queue_capacity,
            server_name: env!("CARGO_PKG_NAME").to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// State with the default queue capacity
    pub fn with_broadcaster(broadcaster: Broadcaster) -> Self {
        Self::new(broadcaster, DEFAULT_QUEUE_CAPACITY)
    }
}

/// Topic and subscriber query parameters.
///
/// Missing parameters deserialize as empty and are rejected by the handlers.
#[derive(Debug, Default, Deserialize)]
pub struct SubscriberParams {
    #[serde(rename = "auctionId", default)]
    pub topic: String,
    #[serde(rename = "subscriberEmail", default)]
    pub subscriber_id: String,
}

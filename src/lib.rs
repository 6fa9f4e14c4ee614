//! Notify Hub
//!
//! Real-time fan-out of bus events to Server-Sent Events subscribers,
//! grouped by topic.
//!
//! # Features
//!
//! - **Topic fan-out**: one message, every subscriber of a topic
//! - **Targeted delivery**: one message, one subscriber
//! - **Drop-on-full backpressure**: slow subscribers are evicted, never waited on
//! - **Heartbeats**: periodic pings keep idle streams alive
//! - **Bus bridge**: Redis pub/sub envelopes relayed into broadcasts
//!
//! # Modules
//!
//! - `types`: Message and bus envelope shapes
//! - `fanout`: Subscriber registry, broadcaster, heartbeat scheduler
//! - `bridge`: External bus trait, adapters, relay and supervisor
//! - `api`: Axum router with SSE and push endpoints
//! - `config`: Environment-driven settings
//! - `utils`: Timestamps, tracing bootstrap, shutdown signal
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use notify_hub::{Broadcaster, Message, Registry};
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = Arc::new(Registry::new());
//!     let broadcaster = Broadcaster::new(Arc::clone(&registry));
//!
//!     let mut alice = registry.register("A1", "alice", 10);
//!     broadcaster.broadcast_to_topic("A1", Message::new("bid", "$50", 1000)).unwrap();
//!     assert_eq!(alice.recv().await, Some(Message::new("bid", "$50", 1000)));
//! }
//! ```

pub mod api;
pub mod bridge;
pub mod config;
pub mod fanout;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use bridge::{ExternalBridge, ExternalBus, InProcessBus};
pub use config::Config;
pub use fanout::{
    BroadcastError, Broadcaster, HeartbeatScheduler, Registry, SubscriberStream,
    DEFAULT_QUEUE_CAPACITY,
};
pub use types::{ExternalEnvelope, Message};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

//! Topic fan-out core
//!
//! - `registry`: live subscriber queues grouped by topic
//! - `broadcaster`: snapshot-then-deliver fan-out with drop-on-full eviction
//! - `heartbeat`: periodic synthetic heartbeats to every topic
//!
//! The registry is the only shared mutable state. Its lock is held for map
//! lookups and mutation only, never while delivering.

pub mod broadcaster;
pub mod error;
pub mod heartbeat;
pub mod registry;

pub use broadcaster::Broadcaster;
pub use error::{BroadcastError, BroadcastResult, DeliveryError};
pub use heartbeat::{HeartbeatReport, HeartbeatScheduler, HEARTBEAT_EVENT_TYPE};
pub use registry::{Registry, SubscriberQueue, SubscriberStream, DEFAULT_QUEUE_CAPACITY};

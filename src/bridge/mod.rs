//! External bus bridge
//!
//! This module contains:
//! - `ExternalBus` trait: subscribe to a channel as a lazy stream of raw payloads
//! - `ExternalBridge`: decodes envelopes and relays them into the broadcaster
//! - `supervise`: caller-side retry loop with exponential backoff
//! - Implementations: in-process (tests, standalone), Redis pub/sub

use async_trait::async_trait;
use futures::stream::BoxStream;

pub mod in_process;
#[cfg(feature = "redis")]
pub mod redis_bus;
pub mod relay;
pub mod supervisor;

pub use in_process::InProcessBus;
#[cfg(feature = "redis")]
pub use redis_bus::RedisBus;
pub use relay::ExternalBridge;
pub use supervisor::{supervise, RetryPolicy};

/// Lazy, possibly infinite sequence of raw payloads from one channel
pub type PayloadStream = BoxStream<'static, String>;

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;

/// Errors that can occur while attaching to the external bus.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Subscribe failed: {0}")]
    Subscribe(String),
}

/// A payload that could not be relayed
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Malformed envelope: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Source of raw payloads for the bridge.
///
/// Implementations:
/// - `InProcessBus`: tokio broadcast channels, no external deps
/// - `RedisBus`: Redis pub/sub (feature `redis`)
#[async_trait]
pub trait ExternalBus: Send + Sync {
    /// Subscribe to `channel`.
    ///
    /// The returned stream ends when the underlying subscription ends.
    async fn subscribe(&self, channel: &str) -> Result<PayloadStream>;
}

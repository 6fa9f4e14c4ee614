//! In-process bus backed by tokio broadcast channels.
//!
//! Useful for tests and for running the server without an external broker.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::warn;

use super::{ExternalBus, PayloadStream, Result};

/// Default per-channel buffer
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Channel name -> broadcast sender
pub struct InProcessBus {
    channels: Mutex<HashMap<String, broadcast::Sender<String>>>,
    capacity: usize,
}

impl InProcessBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus whose channels buffer `capacity` payloads.
    /// Subscribers that fall further behind skip the overflow.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<String> {
        self.channels
            .lock()
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Publish a raw payload; returns how many subscriptions received it
    pub fn publish(&self, channel: &str, payload: impl Into<String>) -> usize {
        self.sender(channel).send(payload.into()).unwrap_or(0)
    }

    /// Number of live subscriptions on `channel`
    pub fn receiver_count(&self, channel: &str) -> usize {
        self.channels
            .lock()
            .get(channel)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Drop the channel, ending every subscription on it
    pub fn close(&self, channel: &str) -> bool {
        self.channels.lock().remove(channel).is_some()
    }
}

impl Default for InProcessBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExternalBus for InProcessBus {
    async fn subscribe(&self, channel: &str) -> Result<PayloadStream> {
        let name = channel.to_string();
        let stream = BroadcastStream::new(self.sender(channel).subscribe()).filter_map(
            move |item| match item {
                Ok(payload) => Some(payload),
                Err(e) => {
                    warn!(channel = %name, error = %e, "Subscription lagged, payloads skipped");
                    None
                }
            },
        );
        Ok(Box::pin(stream))
    }
}

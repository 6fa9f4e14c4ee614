//! Redis pub/sub bus.
//!
//! Each `subscribe` call opens a dedicated pub/sub connection. The stream
//! ends when that connection drops; reconnecting is left to the supervisor.

use async_trait::async_trait;
use futures::{future, StreamExt};
use redis::{Client, Msg};
use tracing::{debug, warn};

use super::{BusError, ExternalBus, PayloadStream, Result};

/// External bus backed by a Redis server
pub struct RedisBus {
    client: Client,
}

impl RedisBus {
    /// Validate `url` and prepare a client. No connection is made yet.
    pub fn open(url: &str) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| BusError::Connection(format!("Invalid Redis URL {}: {}", url, e)))?;
        Ok(Self { client })
    }
}

fn payload_of(msg: Msg) -> Option<String> {
    match msg.get_payload::<String>() {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!(channel = %msg.get_channel_name(), error = %e, "Skipping non-text payload");
            None
        }
    }
}

#[async_trait]
impl ExternalBus for RedisBus {
    async fn subscribe(&self, channel: &str) -> Result<PayloadStream> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| BusError::Connection(e.to_string()))?;

        pubsub
            .subscribe(channel)
            .await
            .map_err(|e| BusError::Subscribe(format!("{}: {}", channel, e)))?;
        debug!(channel = %channel, "Redis subscription established");

        let payloads = pubsub
            .into_on_message()
            .filter_map(|msg| future::ready(payload_of(msg)));
        Ok(Box::pin(payloads))
    }
}

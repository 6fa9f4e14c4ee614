//! Relay from one external channel into the broadcaster

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{BridgeError, ExternalBus, Result};
use crate::fanout::Broadcaster;
use crate::types::ExternalEnvelope;

/// Decodes bus envelopes and turns them into broadcasts
pub struct ExternalBridge {
    broadcaster: Broadcaster,
    channel: String,
}

impl ExternalBridge {
    pub fn new(broadcaster: Broadcaster, channel: impl Into<String>) -> Self {
        Self {
            broadcaster,
            channel: channel.into(),
        }
    }

    /// External channel this bridge listens on
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Relay one raw payload.
    ///
    /// Always broadcasts to the envelope's topic. When the envelope names a
    /// subscriber, that subscriber additionally gets a targeted copy, so it
    /// may see the message twice. Lookup misses are logged, not returned.
    ///
    /// Returns the number of delivery attempts made.
    pub fn relay(&self, raw: &str) -> std::result::Result<usize, BridgeError> {
        let envelope = ExternalEnvelope::decode(raw)?;
        let message = envelope.message();
        let mut attempts = 0;

        match self
            .broadcaster
            .broadcast_to_topic(&envelope.topic, message.clone())
        {
            Ok(n) => attempts += n,
            Err(e) => debug!(channel = %self.channel, error = %e, "Topic broadcast skipped"),
        }

        if let Some(subscriber_id) = envelope.target() {
            match self
                .broadcaster
                .broadcast_to_subscriber(&envelope.topic, subscriber_id, message)
            {
                Ok(n) => attempts += n,
                Err(e) => debug!(channel = %self.channel, error = %e, "Targeted broadcast skipped"),
            }
        }

        Ok(attempts)
    }

    /// Subscribe and relay until the subscription ends or `shutdown` fires.
    ///
    /// Only a failure to subscribe is returned as an error; malformed
    /// payloads are logged and skipped.
    pub async fn run(&self, bus: &dyn ExternalBus, shutdown: &CancellationToken) -> Result<()> {
        let mut payloads = bus.subscribe(&self.channel).await?;
        info!(channel = %self.channel, "Subscribed to external channel");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!(channel = %self.channel, "Bridge stopped");
                    return Ok(());
                }
                next = payloads.next() => match next {
                    Some(raw) => {
                        if let Err(e) = self.relay(&raw) {
                            warn!(channel = %self.channel, error = %e, "Dropping payload");
                        }
                    }
                    None => {
                        info!(channel = %self.channel, "External subscription ended");
                        return Ok(());
                    }
                },
            }
        }
    }
}

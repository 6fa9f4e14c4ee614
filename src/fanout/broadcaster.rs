//! Broadcast engine
//!
//! Looks up target queues in a registry snapshot, then spawns one
//! independent delivery task per subscriber. Delivery is a non-blocking
//! enqueue: a full queue means the subscriber cannot keep up, and it is
//! evicted from the registry. Nothing is retried or requeued.

use std::sync::Arc;

use tracing::{debug, warn};

use super::error::{BroadcastError, BroadcastResult};
use super::registry::{Registry, SubscriberQueue};
use crate::types::Message;

/// Fan-out front end over a shared [`Registry`]
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<Registry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Deliver `message` to every subscriber of `topic`.
    ///
    /// Returns the number of delivery attempts spawned. Must be called from
    /// within a tokio runtime.
    pub fn broadcast_to_topic(&self, topic: &str, message: Message) -> BroadcastResult<usize> {
        let Some(subscribers) = self.registry.snapshot(topic) else {
            warn!(topic = %topic, "Topic not found, dropping broadcast");
            return Err(BroadcastError::TopicNotFound(topic.to_string()));
        };

        let attempts = subscribers.len();
        for (subscriber_id, queue) in subscribers {
            self.spawn_delivery(topic.to_string(), subscriber_id, queue, message.clone());
        }

        debug!(topic = %topic, attempts, event_type = %message.event_type, "Broadcasting message");
        Ok(attempts)
    }

    /// Topic-wide publish, the entry point used by the push endpoint
    pub fn publish(&self, topic: &str, message: Message) -> BroadcastResult<usize> {
        self.broadcast_to_topic(topic, message)
    }

    /// Deliver `message` to exactly one subscriber of `topic`
    pub fn broadcast_to_subscriber(
        &self,
        topic: &str,
        subscriber_id: &str,
        message: Message,
    ) -> BroadcastResult<usize> {
        let queue = match self.registry.snapshot_subscriber(topic, subscriber_id) {
            Ok(queue) => queue,
            Err(e) => {
                warn!(error = %e, "Targeted broadcast failed");
                return Err(e);
            }
        };

        debug!(
            topic = %topic,
            subscriber = %subscriber_id,
            event_type = %message.event_type,
            "Broadcasting message to subscriber"
        );
        self.spawn_delivery(topic.to_string(), subscriber_id.to_string(), queue, message);
        Ok(1)
    }

    fn spawn_delivery(
        &self,
        topic: String,
        subscriber_id: String,
        queue: SubscriberQueue,
        message: Message,
    ) {
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            if let Err(e) = queue.try_deliver(message) {
                warn!(
                    topic = %topic,
                    subscriber = %subscriber_id,
                    error = %e,
                    "Removing subscriber after failed delivery"
                );
                registry.retire(&topic, &subscriber_id, queue.id());
            }
        });
    }
}

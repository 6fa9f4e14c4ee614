//! Subscriber registry
//!
//! Two-level map `Topic -> (SubscriberId -> SubscriberQueue)` behind a single
//! mutex. All mutation goes through [`Registry::register`], [`Registry::remove`]
//! and [`Registry::retire`]; readers get point-in-time copies so delivery never
//! happens under the lock.
//!
//! The registry holds the only strong sender of every queue. Snapshots hand
//! out weak handles, so a queue is closed exactly when the registry releases
//! its sender, and that only happens while the lock is held. The consumer
//! half ([`SubscriberStream`]) then ends once drained.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use super::error::{BroadcastError, BroadcastResult, DeliveryError};
use crate::types::Message;

/// Queue capacity used when the caller has no preference
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Registry-owned queue entry: the only strong sender of the queue
struct InstalledQueue {
    id: u64,
    tx: mpsc::Sender<Message>,
}

impl InstalledQueue {
    fn handle(&self) -> SubscriberQueue {
        SubscriberQueue {
            id: self.id,
            capacity: self.tx.max_capacity(),
            tx: self.tx.downgrade(),
        }
    }
}

type Subscribers = HashMap<String, InstalledQueue>;

/// Weak producer handle to a subscriber's bounded queue.
///
/// Handed out in snapshots. It never keeps the queue open: once the registry
/// closes the queue, deliveries through the handle fail with
/// [`DeliveryError::Closed`].
#[derive(Debug, Clone)]
pub struct SubscriberQueue {
    id: u64,
    capacity: usize,
    tx: mpsc::WeakSender<Message>,
}

impl SubscriberQueue {
    /// Registry-unique id of this queue
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Fixed capacity of the queue
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Non-blocking enqueue
    pub fn try_deliver(&self, message: Message) -> Result<(), DeliveryError> {
        let tx = self.tx.upgrade().ok_or(DeliveryError::Closed)?;
        tx.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Releases the registry's sender. Only called with the registry lock held.
fn close(queue: InstalledQueue) {
    drop(queue);
}

/// Concurrency-safe store of live subscriber queues grouped by topic
pub struct Registry {
    topics: Mutex<HashMap<String, Subscribers>>,
    next_queue_id: AtomicU64,
    // Written and read only with `topics` locked
    closed: AtomicBool,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            next_queue_id: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Install a fresh queue for `(topic, subscriber_id)`.
    ///
    /// A queue already installed for the pair is closed and replaced. A
    /// capacity of zero is treated as one. After [`Registry::close_all`]
    /// nothing is installed and the returned stream is already closed.
    pub fn register(
        self: &Arc<Self>,
        topic: &str,
        subscriber_id: &str,
        capacity: usize,
    ) -> SubscriberStream {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let queue = InstalledQueue {
            id: self.next_queue_id.fetch_add(1, Ordering::SeqCst),
            tx,
        };
        let queue_id = queue.id;

        let replaced = {
            let mut topics = self.topics.lock();
            if self.closed.load(Ordering::SeqCst) {
                close(queue);
                None
            } else {
                let previous = topics
                    .entry(topic.to_string())
                    .or_default()
                    .insert(subscriber_id.to_string(), queue);
                Some(previous.map(close).is_some())
            }
        };

        match replaced {
            None => {
                warn!(topic = %topic, subscriber = %subscriber_id, "Registry closed, refusing subscriber")
            }
            Some(true) => {
                info!(topic = %topic, subscriber = %subscriber_id, "Replaced existing subscriber queue")
            }
            Some(false) => info!(topic = %topic, subscriber = %subscriber_id, "Registered subscriber"),
        }

        SubscriberStream {
            rx,
            registry: Arc::downgrade(self),
            topic: topic.to_string(),
            subscriber_id: subscriber_id.to_string(),
            queue_id,
        }
    }

    /// Remove whatever queue is installed for the pair.
    ///
    /// Idempotent; returns whether a queue was removed.
    pub fn remove(&self, topic: &str, subscriber_id: &str) -> bool {
        self.remove_where(topic, subscriber_id, |_| true)
    }

    /// Remove the pair only if its installed queue is `queue_id`.
    ///
    /// Used for evictions and stream teardown, where the queue may already
    /// have been replaced by a newer registration.
    pub fn retire(&self, topic: &str, subscriber_id: &str, queue_id: u64) -> bool {
        self.remove_where(topic, subscriber_id, |queue| queue.id == queue_id)
    }

    fn remove_where(
        &self,
        topic: &str,
        subscriber_id: &str,
        matches: impl FnOnce(&InstalledQueue) -> bool,
    ) -> bool {
        let removed = {
            let mut topics = self.topics.lock();
            let Some(subscribers) = topics.get_mut(topic) else {
                return false;
            };

            let removed = match subscribers.get(subscriber_id) {
                Some(queue) if matches(queue) => subscribers.remove(subscriber_id),
                _ => None,
            };
            if subscribers.is_empty() {
                topics.remove(topic);
            }
            removed.map(close).is_some()
        };

        if removed {
            info!(topic = %topic, subscriber = %subscriber_id, "Removed subscriber");
        } else {
            debug!(topic = %topic, subscriber = %subscriber_id, "Nothing to remove");
        }
        removed
    }

    /// Close every queue, drop every topic and refuse later registrations.
    ///
    /// Used at shutdown so open streams end. Returns how many queues were closed.
    pub fn close_all(&self) -> usize {
        let closed = {
            let mut topics = self.topics.lock();
            self.closed.store(true, Ordering::SeqCst);
            let closed = topics.values().map(HashMap::len).sum();
            for (_, subscribers) in topics.drain() {
                subscribers.into_values().for_each(close);
            }
            closed
        };
        info!(closed, "Closed all subscriber queues");
        closed
    }

    /// Point-in-time copy of a topic's subscribers, `None` if the topic is unknown
    pub fn snapshot(&self, topic: &str) -> Option<HashMap<String, SubscriberQueue>> {
        self.topics.lock().get(topic).map(|subscribers| {
            subscribers
                .iter()
                .map(|(subscriber_id, queue)| (subscriber_id.clone(), queue.handle()))
                .collect()
        })
    }

    /// Look up a single subscriber's queue
    pub fn snapshot_subscriber(
        &self,
        topic: &str,
        subscriber_id: &str,
    ) -> BroadcastResult<SubscriberQueue> {
        let topics = self.topics.lock();
        let subscribers = topics
            .get(topic)
            .ok_or_else(|| BroadcastError::TopicNotFound(topic.to_string()))?;
        subscribers
            .get(subscriber_id)
            .map(InstalledQueue::handle)
            .ok_or_else(|| BroadcastError::SubscriberNotFound {
                topic: topic.to_string(),
                subscriber_id: subscriber_id.to_string(),
            })
    }

    /// Point-in-time copy of all topic keys
    pub fn all_topics(&self) -> Vec<String> {
        self.topics.lock().keys().cloned().collect()
    }

    pub fn topic_count(&self) -> usize {
        self.topics.lock().len()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.lock().get(topic).map_or(0, HashMap::len)
    }

    pub fn contains(&self, topic: &str, subscriber_id: &str) -> bool {
        self.topics
            .lock()
            .get(topic)
            .is_some_and(|subscribers| subscribers.contains_key(subscriber_id))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer half of a subscriber queue, handed to the transport.
///
/// Ends once the registry closes the queue and the buffered messages are
/// drained. Dropping it retires the queue it was created with.
pub struct SubscriberStream {
    rx: mpsc::Receiver<Message>,
    registry: Weak<Registry>,
    topic: String,
    subscriber_id: String,
    queue_id: u64,
}

impl SubscriberStream {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn subscriber_id(&self) -> &str {
        &self.subscriber_id
    }

    pub fn queue_id(&self) -> u64 {
        self.queue_id
    }

    /// Wait for the next message; `None` once the queue is closed and empty
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// Take a buffered message without waiting
    pub fn try_recv(&mut self) -> Option<Message> {
        self.rx.try_recv().ok()
    }
}

impl Stream for SubscriberStream {
    type Item = Message;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Message>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for SubscriberStream {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.retire(&self.topic, &self.subscriber_id, self.queue_id);
        }
    }
}

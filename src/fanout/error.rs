//! Errors returned by registry lookups and broadcasts

/// Result type for broadcast operations
pub type BroadcastResult<T> = Result<T, BroadcastError>;

/// Lookup failures surfaced to the caller of a broadcast.
///
/// Neither is fatal: they affect only the call that produced them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BroadcastError {
    #[error("topic {0} not found")]
    TopicNotFound(String),

    #[error("subscriber {subscriber_id} not found for topic {topic}")]
    SubscriberNotFound { topic: String, subscriber_id: String },
}

/// Why a non-blocking enqueue did not go through
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("subscriber queue is full")]
    Full,

    #[error("subscriber queue is closed")]
    Closed,
}

//! Message types delivered to subscribers and received from the external bus

use serde::{Deserialize, Deserializer, Serialize};

/// Unit delivered to a subscriber queue.
///
/// Serialized as `{"eventType": .., "message": .., "timestamp": ..}`, which is
/// the shape SSE clients receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(rename = "message")]
    pub payload: String,
    #[serde(default)]
    pub timestamp: i64,
}

impl Message {
    /// Create a new message
    pub fn new(event_type: impl Into<String>, payload: impl Into<String>, timestamp: i64) -> Self {
        Self {
            event_type: event_type.into(),
            payload: payload.into(),
            timestamp,
        }
    }

    /// A message is publishable only with a non-empty event type and payload
    pub fn is_complete(&self) -> bool {
        !self.event_type.is_empty() && !self.payload.is_empty()
    }
}

/// Envelope published on the external bus.
///
/// Decoding is lenient: a missing or `null` field reads as empty (or zero).
/// `subscriberEmail` is optional; when present and non-empty the bridge also
/// performs a targeted delivery to that subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalEnvelope {
    #[serde(rename = "auctionId", default, deserialize_with = "null_as_default")]
    pub topic: String,
    #[serde(
        rename = "subscriberEmail",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub subscriber_id: Option<String>,
    #[serde(rename = "eventType", default, deserialize_with = "null_as_default")]
    pub event_type: String,
    #[serde(rename = "message", default, deserialize_with = "null_as_default")]
    pub payload: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: i64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ExternalEnvelope {
    /// Decode an envelope from a raw bus payload
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Subscriber targeted by this envelope, if any
    pub fn target(&self) -> Option<&str> {
        self.subscriber_id.as_deref().filter(|id| !id.is_empty())
    }

    /// The message to deliver to subscribers
    pub fn message(&self) -> Message {
        Message {
            event_type: self.event_type.clone(),
            payload: self.payload.clone(),
            timestamp: self.timestamp,
        }
    }
}

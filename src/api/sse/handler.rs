//! SSE and push HTTP handlers

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use super::{SseState, SubscriberParams};
use crate::types::Message;
use crate::utils::current_timestamp;

/// SSE event name every message is sent under
pub const MESSAGE_EVENT: &str = "data";

/// Interval between keep-alive comments on idle streams
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// GET /live-notification - SSE stream for one subscriber
pub async fn live_notification_handler(
    State(state): State<Arc<SseState>>,
    Query(params): Query<SubscriberParams>,
) -> Response {
    if params.topic.is_empty() || params.subscriber_id.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Missing auction/subscriber details");
    }

    info!(topic = %params.topic, subscriber = %params.subscriber_id, "New SSE connection");

    // Dropping the stream (client gone, server shutting down) retires the queue
    let mut subscriber = state.broadcaster.registry().register(
        &params.topic,
        &params.subscriber_id,
        state.queue_capacity,
    );

    let stream = async_stream::stream! {
        while let Some(message) = subscriber.recv().await {
            match Event::default().event(MESSAGE_EVENT).json_data(&message) {
                Ok(event) => {
                    yield Ok::<_, Infallible>(event);
                }
                Err(e) => warn!(error = %e, "Failed to encode message"),
            }
        }
        info!(
            topic = %subscriber.topic(),
            subscriber = %subscriber.subscriber_id(),
            "SSE stream closed"
        );
    };

    Sse::new(stream)
        .keep_alive(KeepAlive::default().interval(KEEP_ALIVE_INTERVAL))
        .into_response()
}

/// POST /push-message - publish a message to a topic, or to one subscriber
/// when `subscriberEmail` is given
pub async fn push_message_handler(
    State(state): State<Arc<SseState>>,
    Query(params): Query<SubscriberParams>,
    body: Result<Json<Message>, JsonRejection>,
) -> Response {
    if params.topic.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Missing auction details");
    }

    let mut message = match body {
        Ok(Json(message)) if message.is_complete() => message,
        _ => return error_response(StatusCode::BAD_REQUEST, "Invalid request body"),
    };
    if message.timestamp == 0 {
        message.timestamp = current_timestamp();
    }

    let result = if params.subscriber_id.is_empty() {
        state.broadcaster.publish(&params.topic, message)
    } else {
        state
            .broadcaster
            .broadcast_to_subscriber(&params.topic, &params.subscriber_id, message)
    };

    match result {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "message": "Message broadcasted successfully" })),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::NOT_FOUND, &e.to_string()),
    }
}

/// GET /info - Get server info
#[derive(Debug, Serialize)]
pub struct ServerInfoResponse {
    pub name: String,
    pub version: String,
    pub topics: usize,
}

pub async fn server_info_handler(State(state): State<Arc<SseState>>) -> impl IntoResponse {
    let info = ServerInfoResponse {
        name: state.server_name.clone(),
        version: state.server_version.clone(),
        topics: state.broadcaster.registry().topic_count(),
    };
    Json(info)
}

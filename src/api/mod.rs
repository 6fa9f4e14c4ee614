//! API module for HTTP endpoints
//!
//! This module provides the SSE subscription stream and the push endpoint.

pub mod http;
pub mod sse;

pub use http::create_router;
pub use sse::SseState;

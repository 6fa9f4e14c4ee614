//! Utility functions and helpers
//!
//! This module contains timestamp, tracing and shutdown-signal helpers.

pub mod logging;
pub mod shutdown;
pub mod time;

pub use logging::init_tracing;
pub use shutdown::wait_for_shutdown_signal;
pub use time::current_timestamp;

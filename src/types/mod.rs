//! Data types for the notification hub
//!
//! This module contains the message shapes shared by the fan-out core,
//! the bus bridge and the HTTP transport.

mod message;

pub use message::{ExternalEnvelope, Message};

//! Drop Relay - watches Telegram channels for promo code drops and relays
//! them to WebSocket clients in real time
//!
//! This library provides the relay hub, the code extraction strategies
//! and the Telegram source that feeds them.

pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod security;
pub mod sinks;
pub mod telegram;

// Re-export main components
pub use config::*;
pub use constants::*;
pub use error::{RelayError, Result};

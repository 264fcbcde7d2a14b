//! Core functionality of the relay

pub mod connection;
pub mod hub;
pub mod message;
pub mod relay;
pub mod seen;

// Re-export main components for convenience
pub use connection::Connection;
pub use hub::{create_hub, RelayHub, SharedHub};
pub use message::{Code, ExtractionMethod, RelayEvent};
pub use relay::{Delivery, Relay};
pub use seen::SeenCodes;

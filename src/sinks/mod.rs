//! Delivery sinks: external destinations that receive every relayed code

pub mod backend;
pub mod telegram;

use async_trait::async_trait;

use crate::core::message::Code;
use crate::error::Result;

pub use backend::BackendSink;
pub use telegram::TelegramSink;

/// A destination the relay hands each new code to
#[async_trait]
pub trait Sink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Deliver one code. Errors are logged by the relay and never retried.
    async fn deliver(&self, code: &Code) -> Result<()>;
}

/// Boxed sink list owned by the relay
pub type Sinks = Vec<Box<dyn Sink>>;

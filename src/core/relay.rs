//! Relay dispatcher
//! Routes every extracted code through dedup, the client hub and the sinks

use log::{error, info, warn};
use std::sync::Mutex;

use crate::core::hub::SharedHub;
use crate::core::message::{Code, RelayEvent};
use crate::core::seen::SeenCodes;
use crate::error::Result;
use crate::sinks::{Sink, Sinks};

/// Outcome of handing one code to the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The normalized code was already relayed earlier
    Duplicate,
    Sent {
        clients: usize,
        sinks_ok: usize,
        sinks_failed: usize,
    },
}

pub struct Relay {
    hub: SharedHub,
    seen: Option<Mutex<SeenCodes>>,
    sinks: Sinks,
}

impl Relay {
    pub fn new(hub: SharedHub) -> Self {
        Self {
            hub,
            seen: None,
            sinks: Vec::new(),
        }
    }

    /// Enable deduplication against a seen-set
    pub fn with_dedup(mut self, seen: SeenCodes) -> Self {
        self.seen = Some(Mutex::new(seen));
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn hub(&self) -> &SharedHub {
        &self.hub
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Returns `true` if the code has not been relayed yet and records it
    fn claim(&self, code: &Code) -> Result<bool> {
        match &self.seen {
            Some(seen) => Ok(seen.lock()?.insert(&code.normalized)),
            None => Ok(true),
        }
    }

    /// Deliver a code to every client and sink.
    ///
    /// Sink failures are logged and counted; only a poisoned lock is
    /// reported as an error.
    pub async fn deliver(&self, code: Code) -> Result<Delivery> {
        if !self.claim(&code)? {
            info!("Skipping duplicate code {} ({})", code.raw, code.method);
            return Ok(Delivery::Duplicate);
        }

        info!("Relaying code {} extracted via {}", code.raw, code.method);
        let clients = self.hub.broadcast(&RelayEvent::code_drop(&code))?;

        let mut sinks_ok = 0;
        let mut sinks_failed = 0;
        for sink in &self.sinks {
            match sink.deliver(&code).await {
                Ok(()) => sinks_ok += 1,
                Err(e) => {
                    warn!("Sink {} failed for code {}: {}", sink.name(), code.raw, e);
                    sinks_failed += 1;
                }
            }
        }

        if sinks_failed > 0 && sinks_ok == 0 && clients == 0 {
            error!("Code {} reached no client and no sink", code.raw);
        }

        Ok(Delivery::Sent {
            clients,
            sinks_ok,
            sinks_failed,
        })
    }
}

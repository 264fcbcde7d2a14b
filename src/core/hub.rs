//! Relay hub: the registry of connected clients and the fan-out over it

use log::{debug, error, info};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::core::connection::Connection;
use crate::core::message::RelayEvent;
use crate::error::Result;

/// Owns every live client connection behind a single lock
pub struct RelayHub {
    clients: Mutex<HashMap<String, Connection>>,
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayHub {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn lock_clients(&self) -> Result<MutexGuard<'_, HashMap<String, Connection>>> {
        Ok(self.clients.lock()?)
    }

    /// Register a client connection and return its ID
    pub fn register(&self, connection: Connection) -> Result<String> {
        let id = connection.id.clone();
        let mut clients = self.lock_clients()?;
        clients.insert(id.clone(), connection);
        debug!("Registered client {} ({} connected)", id, clients.len());
        Ok(id)
    }

    /// Remove a client connection. Unknown IDs are not an error.
    pub fn unregister(&self, id: &str) -> Result<bool> {
        let mut clients = self.lock_clients()?;
        match clients.remove(id) {
            Some(conn) => {
                debug!(
                    "Unregistered client {} after {:?}",
                    id,
                    conn.connection_duration()
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Serialize an event once and push it to every client
    pub fn broadcast(&self, event: &RelayEvent) -> Result<usize> {
        let payload = serde_json::to_string(event)?;
        let delivered = self.send_to_all(&payload)?;
        if !matches!(event, RelayEvent::Ping { .. }) {
            info!("Broadcast {} to {} clients", payload, delivered);
        }
        Ok(delivered)
    }

    /// Push a pre-serialized payload to every client
    pub fn broadcast_text(&self, payload: &str) -> Result<usize> {
        let delivered = self.send_to_all(payload)?;
        info!("Broadcast raw payload to {} clients", delivered);
        Ok(delivered)
    }

    /// Send a heartbeat ping to every client, evicting the ones that fail
    pub fn keepalive(&self) -> Result<usize> {
        self.broadcast(&RelayEvent::ping())
    }

    fn send_to_all(&self, payload: &str) -> Result<usize> {
        let mut clients = self.lock_clients()?;

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, connection) in clients.iter() {
            if connection.send_text(payload) {
                delivered += 1;
            } else {
                dead.push(id.clone());
            }
        }

        for id in &dead {
            clients.remove(id);
        }
        if !dead.is_empty() {
            debug!(
                "Evicted {} dead clients, {} remaining",
                dead.len(),
                clients.len()
            );
        }

        Ok(delivered)
    }

    /// Get current clients count
    pub fn client_count(&self) -> usize {
        self.lock_clients().map(|clients| clients.len()).unwrap_or(0)
    }

    /// Run `keepalive` on a fixed interval until the task is aborted
    pub fn spawn_keepalive(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match self.keepalive() {
                    Ok(count) => debug!("Keepalive ping sent to {} clients", count),
                    Err(e) => error!("Keepalive failed: {}", e),
                }
            }
        })
    }
}

// Thread-safe hub handle
pub type SharedHub = Arc<RelayHub>;

// Create a new shareable hub
pub fn create_hub() -> SharedHub {
    Arc::new(RelayHub::new())
}

use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use warp::ws::{Message, WebSocket};

use crate::core::connection::Connection;
use crate::core::hub::SharedHub;
use crate::core::message::RelayEvent;

// Handle a WebSocket client for the lifetime of its connection
pub async fn handle_ws_client(ws: WebSocket, hub: SharedHub) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (tx, rx) = mpsc::unbounded_channel();

    // Forward messages from our channel to the WebSocket. When the socket
    // breaks this task ends and drops `rx`, so the hub's next send fails.
    tokio::task::spawn(async move {
        let mut rx = rx;
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_tx.send(message).await {
                debug!("Failed to write to WebSocket: {}", e);
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let connection = Connection::new(tx.clone());
    let client_id = connection.id.clone();

    let greeting = RelayEvent::Connected {
        client_id: client_id.clone(),
    };
    match serde_json::to_string(&greeting) {
        Ok(text) => {
            if tx.send(Message::text(text)).is_err() {
                warn!("Client {} went away before the greeting", client_id);
                return;
            }
        }
        Err(e) => error!("Failed to serialize greeting: {}", e),
    }

    if let Err(e) = hub.register(connection) {
        error!("Failed to register client {}: {}", client_id, e);
        return;
    }
    info!("Client connected: {} (total: {})", client_id, hub.client_count());

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(msg) => {
                if msg.is_close() {
                    break;
                }
                if let Ok(text) = msg.to_str() {
                    if is_ping(text) && tx.send(Message::text("pong")).is_err() {
                        break;
                    }
                }
            }
            Err(e) => {
                debug!("WebSocket error for {}: {}", client_id, e);
                break;
            }
        }
    }

    match hub.unregister(&client_id) {
        Ok(_) => info!("Client disconnected: {} (total: {})", client_id, hub.client_count()),
        Err(e) => error!("Error unregistering client {}: {}", client_id, e),
    }
}

/// Client-side heartbeat: a bare `ping` text frame
fn is_ping(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("ping")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_detection() {
        assert!(is_ping("ping"));
        assert!(is_ping("  PING\n"));
        assert!(!is_ping("pong"));
        assert!(!is_ping(r#"{"type":"ping"}"#));
    }
}

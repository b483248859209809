//! WebSocket handler for live reload.
//!
//! Each connection is one notification channel: registered with the hub on
//! upgrade, unregistered when either side closes or the socket errors.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;

use super::hub::{BroadcastHub, NotificationChannel};

/// Handle WebSocket upgrade for live reload.
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(hub): State<Arc<BroadcastHub>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, hub))
}

/// Handle an established WebSocket connection.
async fn handle_socket(mut socket: WebSocket, hub: Arc<BroadcastHub>) {
    let (channel, mut receiver) = NotificationChannel::new();
    let id = channel.id();
    hub.register(channel);
    tracing::info!(channel = %id, clients = hub.len(), "Live reload client connected");

    loop {
        tokio::select! {
            // Forward notifications to the browser
            message = receiver.recv() => {
                let Some(message) = message else {
                    break;
                };
                if socket.send(Message::Text(message.into())).await.is_err() {
                    break;
                }
            }
            // Client payloads are ignored; reading is how a close is noticed
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::warn!(channel = %id, error = %err, "Live reload socket error");
                        break;
                    }
                }
            }
        }
    }

    // Dropping the receiver first makes the channel read as closed to any
    // broadcast that still holds the lock
    drop(receiver);
    hub.unregister(id);
    tracing::info!(channel = %id, clients = hub.len(), "Live reload client disconnected");
}

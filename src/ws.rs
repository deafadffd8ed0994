//! WebSocket transport: connection lifetime around the synchronizer.
//!
//! Each connection gets a freshly minted id and one outbound channel; a
//! forward task drains that channel into the socket sink so the fan-out can
//! deliver without holding the socket. On close the connection is
//! unregistered from the fan-out and removed from every room it joined.
//! In-flight event handling is not cancelled by disconnection.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::sync;
use crate::types::ConnectionId;

/// Frames the forward task can push to the socket
enum Outbound {
    Event(ServerMessage),
    Pong(axum::body::Bytes),
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id: ConnectionId = ulid::Ulid::new().to_string();
    tracing::info!("WebSocket connected: {}", connection_id);

    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Outbound>();

    // Forward task: drain the outbound channel into the socket sink
    let forward_conn = connection_id.clone();
    let forward = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            let result = match frame {
                Outbound::Event(msg) => match serde_json::to_string(&msg) {
                    Ok(json) => sink.send(Message::Text(json.into())).await,
                    Err(e) => {
                        tracing::error!("Failed to serialize server message: {}", e);
                        continue;
                    }
                },
                Outbound::Pong(data) => sink.send(Message::Pong(data)).await,
            };

            if result.is_err() {
                tracing::debug!("Send failed, client {} disconnected", forward_conn);
                break;
            }
        }
    });

    // Register with the fan-out so room deliveries reach this connection
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.fanout.register(&connection_id, event_tx).await;

    let bridge_tx = outbound_tx.clone();
    let bridge = tokio::spawn(async move {
        while let Some(msg) = event_rx.recv().await {
            if bridge_tx.send(Outbound::Event(msg)).is_err() {
                break;
            }
        }
    });

    // Inbound loop: parse and dispatch client events
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let msg = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        tracing::warn!("Failed to parse client message: {}", e);
                        let _ = outbound_tx.send(Outbound::Event(ServerMessage::Error {
                            code: "PARSE_ERROR".to_string(),
                            msg: format!("Invalid message format: {}", e),
                        }));
                        continue;
                    }
                };

                if let Some(reply) = sync::handle_event(msg, &connection_id, &state).await {
                    if outbound_tx.send(Outbound::Event(reply)).is_err() {
                        break;
                    }
                }
            }
            Ok(Message::Ping(data)) => {
                let _ = outbound_tx.send(Outbound::Pong(data));
            }
            Ok(Message::Close(_)) => {
                tracing::info!("WebSocket {} closed by client", connection_id);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("WebSocket error on {}: {}", connection_id, e);
                break;
            }
        }
    }

    // Disconnect hook: drop fan-out registration and room membership
    state.fanout.unregister(&connection_id).await;
    state.rooms.disconnect(&connection_id).await;
    bridge.abort();
    forward.abort();

    tracing::info!("WebSocket connection closed: {}", connection_id);
}

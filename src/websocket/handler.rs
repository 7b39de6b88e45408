use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::game::room::UserId;
use crate::protocol::{ClientMessage, ErrorCode, ServerMessage};
use crate::server::{dispatch, GameServer};

/// WebSocket upgrade endpoint for the game protocol.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(server): State<Arc<GameServer>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, server, addr))
}

async fn handle_socket(socket: WebSocket, server: Arc<GameServer>, addr: SocketAddr) {
    let (mut sink, mut stream) = socket.split();
    let (sender, mut receiver) = mpsc::unbounded_channel::<String>();

    // Writer half: everything leaving this connection funnels through the
    // channel so the bus pump and direct replies share one sink.
    let writer = tokio::spawn(async move {
        while let Some(payload) = receiver.recv().await {
            if sink.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    // First message must authenticate the connection.
    let user_id = match authenticate(&server, &mut stream, &sender).await {
        Some(user_id) => user_id,
        None => {
            writer.abort();
            return;
        }
    };
    tracing::info!(%user_id, %addr, "Client connected");

    while let Some(message) = stream.next().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(%user_id, "Socket error: {e}");
                break;
            }
        };
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let parsed: ClientMessage = match serde_json::from_str(text.as_str()) {
            Ok(parsed) => parsed,
            Err(e) => {
                send(&sender, &ServerMessage::Error {
                    reason: format!("malformed message: {e}"),
                    code: ErrorCode::InvalidInput,
                });
                continue;
            }
        };

        if let Some(reply) = dispatch(&server, user_id, parsed).await {
            server.connections.send_to_user(user_id, &reply);
        }
    }

    tracing::info!(%user_id, "Client disconnected");
    server.connections.mark_disconnected(user_id);
    writer.abort();
}

/// Read the opening `auth` message and register the connection. A
/// returning user lands back in their seat; their player flips from
/// disconnected to alive.
async fn authenticate(
    server: &Arc<GameServer>,
    stream: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
    sender: &mpsc::UnboundedSender<String>,
) -> Option<UserId> {
    let message = loop {
        match stream.next().await? {
            Ok(Message::Text(text)) => break text,
            Ok(Message::Close(_)) => return None,
            Ok(_) => continue,
            Err(_) => return None,
        }
    };

    match serde_json::from_str::<ClientMessage>(message.as_str()) {
        Ok(ClientMessage::Authenticate { user_id, name }) => {
            server
                .connections
                .register(user_id, name, sender.clone());
            if let Err(e) = server.handle_reconnect(user_id).await {
                tracing::warn!(%user_id, "Reconnect restore failed: {e}");
            }
            send(sender, &ServerMessage::Authenticated { user_id });
            Some(user_id)
        }
        _ => {
            send(sender, &ServerMessage::Error {
                reason: "the first message must be auth".to_string(),
                code: ErrorCode::Unauthorized,
            });
            None
        }
    }
}

fn send(sender: &mpsc::UnboundedSender<String>, message: &ServerMessage) {
    match serde_json::to_string(message) {
        Ok(json) => {
            let _ = sender.send(json);
        }
        Err(e) => tracing::error!("Failed to serialize reply: {e}"),
    }
}

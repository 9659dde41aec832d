//! WebSocket stream of controller status.

use crate::web::AppState;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use std::time::SystemTime;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, error, info, warn};

/// A connected status stream client.
#[derive(Debug, Clone)]
pub struct Client {
    pub id: String,
    pub connected_at: SystemTime,
}

/// Claim a client slot, or `None` once the configured number of clients is
/// connected. Check and insert happen under one write lock.
pub async fn reserve_slot(state: &AppState) -> Option<String> {
    let mut clients = state.clients.write().await;
    if clients.len() >= state.config.max_websocket_connections {
        warn!(
            connected = clients.len(),
            "Refusing WebSocket client: connection limit reached"
        );
        return None;
    }

    let client_id = uuid::Uuid::new_v4().to_string();
    clients.insert(
        client_id.clone(),
        Client {
            id: client_id.clone(),
            connected_at: SystemTime::now(),
        },
    );
    Some(client_id)
}

/// WebSocket upgrade handler.
pub async fn websocket_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let Some(client_id) = reserve_slot(&state).await else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    let clients = state.clients.clone();
    let failed_id = client_id.clone();
    ws.on_failed_upgrade(move |e| {
        warn!("WebSocket upgrade failed for {}: {}", failed_id, e);
        tokio::spawn(async move {
            clients.write().await.remove(&failed_id);
        });
    })
    .on_upgrade(move |socket| handle_websocket(socket, state, client_id))
}

/// Push every status change to the client until either side closes.
async fn handle_websocket(socket: WebSocket, state: AppState, client_id: String) {
    info!("WebSocket client connected: {}", client_id);

    let (mut sender, mut receiver) = socket.split();

    let client_id_recv = client_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(Message::Text(text)) => {
                    debug!("Ignoring message from {}: {}", client_id_recv, text);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket error for client {}: {}", client_id_recv, e);
                    break;
                }
            }
        }
    });

    let client_id_send = client_id.clone();
    let mut updates = WatchStream::new(state.control.subscribe());
    let mut send_task = tokio::spawn(async move {
        while let Some(snapshot) = updates.next().await {
            match serde_json::to_string(&snapshot) {
                Ok(text) => {
                    if let Err(e) = sender.send(Message::Text(text)).await {
                        debug!("Client {} went away: {}", client_id_send, e);
                        break;
                    }
                }
                Err(e) => error!("Failed to serialize status for {}: {}", client_id_send, e),
            }
        }
    });

    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    }

    state.clients.write().await.remove(&client_id);
    info!("WebSocket client disconnected: {}", client_id);
}

//! WebSocket connection handler.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::{protocol::ClientEvent, state::AppState};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drains the outbound channel into the socket until either side closes.
///
/// The coordinator pushes frames onto this channel without awaiting; when
/// it drops the sender (kick from the registry, admin ban) `recv` returns
/// `None` and the socket is torn down from here.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, mut receiver) = socket.split();

    let (tx, rx) = mpsc::unbounded_channel();
    let conn_id = state.coordinator.lock().await.register_connection(tx);

    let conn_id_clone = conn_id.clone();
    let state_clone = state.clone();

    // Inbound: parse each text frame and hand it to the coordinator.
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!("WebSocket error on '{}': {}", conn_id_clone, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    let event = match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => event,
                        Err(e) => {
                            // Malformed frames never reach the coordinator
                            tracing::warn!("Dropping unparseable frame: {}", e);
                            continue;
                        }
                    };
                    state_clone
                        .coordinator
                        .lock()
                        .await
                        .handle(&conn_id_clone, event);
                }
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", conn_id_clone);
                    break;
                }
                // Ping/pong is answered by the protocol layer
                _ => {}
            }
        }
    });

    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Leaves the room (with host failover), closes history, drops the
    // registry entry. A no-op if an admin ban already removed it.
    state.coordinator.lock().await.remove_connection(&conn_id);
    tracing::info!("Connection '{}' closed", conn_id);
}

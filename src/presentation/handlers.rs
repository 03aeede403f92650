// HTTP and WebSocket request handlers
use crate::infrastructure::snapshot_mapper::StateSnapshot;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current series and log contents
pub async fn snapshot(State(state): State<Arc<AppState>>) -> Json<StateSnapshot> {
    Json(state.bridge.snapshot().await)
}

/// Live message stream for one client
pub async fn ws_endpoint(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let bridge = &state.bridge;
    let mut rx = bridge.subscribe();
    tracing::info!("WebSocket client connected");

    if let Err(e) = socket.send(Message::Text(bridge.connection_message())).await {
        tracing::warn!("Failed to send connection info: {}", e);
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(payload) => {
                        if let Err(e) = socket.send(Message::Text(payload)).await {
                            tracing::debug!("Client send failed: {}", e);
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!("WebSocket client lagged behind by {} messages", n);
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            message = socket.recv() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = bridge.handle_client_text(&text).await {
                            tracing::error!("Failed to send command: {:#}", e);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::warn!("WebSocket error: {}", e);
                        break;
                    }
                    // Ping/pong is answered by the socket itself
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    tracing::info!("WebSocket client disconnected");
}

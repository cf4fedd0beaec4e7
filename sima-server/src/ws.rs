//! `/ws` socket channel
//!
//! JSON envelopes (`SocketEvent`) over a plain WebSocket. The server greets
//! with `connected`, then answers each `chat_message` in order with either
//! `ai_response` or `error`, echoing the message's `request_id`.

use crate::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use sima_core::SocketEvent;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Largest frame accepted from a client
const MAX_FRAME_BYTES: usize = 64 * 1024;

pub async fn socket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.max_message_size(MAX_FRAME_BYTES)
        .on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();
    info!("Client {} connected", client_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<SocketEvent>(16);

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match event.to_json() {
                Ok(json) => json,
                Err(e) => {
                    warn!("Failed to encode {} event: {}", event.name(), e);
                    continue;
                }
            };
            if sender.send(Message::Text(json)).await.is_err() {
                debug!("Client {}: send failed, closing", client_id);
                break;
            }
        }
        let _ = sender.close().await;
    });

    let greeting = SocketEvent::Connected {
        message: "Sunucuya başarıyla bağlandınız".to_string(),
        model: Some(state.generator.model().to_string()),
    };
    if tx.send(greeting).await.is_err() {
        send_task.abort();
        return;
    }

    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    warn!("Client {}: receive error: {}", client_id, e);
                    break;
                }
            };

            let reply = match SocketEvent::from_json(&text) {
                Ok(SocketEvent::ChatMessage(request)) => match state.answer(&request, false).await {
                    Ok(reply) => SocketEvent::AiResponse(reply),
                    Err(e) => {
                        warn!("Client {}: chat failed: {}", client_id, e);
                        SocketEvent::Error {
                            message: e.to_string(),
                            request_id: request.request_id,
                        }
                    }
                },
                Ok(other) => {
                    debug!("Client {}: ignoring {} event", client_id, other.name());
                    continue;
                }
                Err(e) => SocketEvent::Error {
                    message: format!("Geçersiz mesaj: {}", e),
                    request_id: None,
                },
            };
            if tx.send(reply).await.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => {
            // Let queued replies drain before the sender closes
            let _ = send_task.await;
        }
    }

    info!("Client {} disconnected", client_id);
}

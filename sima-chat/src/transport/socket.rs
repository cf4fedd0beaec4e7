//! WebSocket channel speaking the `{"event", "data"}` envelope

use crate::error::TransportError;
use crate::transport::ChatTransport;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use sima_core::{ChatReply, ChatRequest, SocketEvent};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

struct Waiter {
    request_id: u64,
    reply: oneshot::Sender<Result<ChatReply, TransportError>>,
}

type Pending = Arc<Mutex<Option<Waiter>>>;

/// Socket transport
///
/// Only one chat message is in flight at a time. Each message carries a
/// `request_id`; a reply tagged with another id (for instance one that
/// arrives after its request timed out) is dropped. Untagged replies go to
/// whoever is waiting.
pub struct SocketTransport {
    outgoing: mpsc::UnboundedSender<Message>,
    connected: Arc<AtomicBool>,
    pending: Pending,
    in_flight: tokio::sync::Mutex<()>,
    next_request_id: AtomicU64,
    greeting: Arc<RwLock<Option<String>>>,
    reply_timeout: Duration,
    tasks: Vec<JoinHandle<()>>,
}

impl SocketTransport {
    pub async fn connect(url: &str, connect_timeout: Duration, reply_timeout: Duration) -> Result<Self, TransportError> {
        let url = url::Url::parse(url).map_err(|e| TransportError::Connect(format!("invalid socket URL: {}", e)))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(TransportError::Connect("socket URL must use ws:// or wss://".to_string()));
        }

        let (stream, _) = tokio::time::timeout(connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| TransportError::Connect(format!("timed out after {:?}", connect_timeout)))?
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        info!("Socket connected to {}", url);

        let (mut sink, mut source) = stream.split();
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();
        let connected = Arc::new(AtomicBool::new(true));
        let pending: Pending = Arc::new(Mutex::new(None));
        let greeting = Arc::new(RwLock::new(None));

        let writer = {
            let connected = connected.clone();
            let pending = pending.clone();
            tokio::spawn(async move {
                while let Some(message) = outgoing_rx.recv().await {
                    let closing = matches!(message, Message::Close(_));
                    if let Err(e) = sink.send(message).await {
                        warn!("Socket write failed: {}", e);
                        connected.store(false, Ordering::SeqCst);
                        if let Some(waiter) = pending.lock().take() {
                            let _ = waiter.reply.send(Err(TransportError::SendFailed(e.to_string())));
                        }
                        break;
                    }
                    if closing {
                        break;
                    }
                }
            })
        };

        let reader = {
            let connected = connected.clone();
            let pending = pending.clone();
            let greeting = greeting.clone();
            tokio::spawn(async move {
                while let Some(frame) = source.next().await {
                    let text = match frame {
                        Ok(Message::Text(text)) => text,
                        Ok(Message::Close(_)) => break,
                        Ok(_) => continue,
                        Err(e) => {
                            warn!("Socket read failed: {}", e);
                            break;
                        }
                    };
                    match SocketEvent::from_json(&text) {
                        Ok(SocketEvent::Connected { message, model }) => {
                            info!("Backend greeting: {}", message);
                            *greeting.write() = model;
                        }
                        Ok(SocketEvent::AiResponse(reply)) => {
                            resolve(&pending, reply.request_id, Ok(reply));
                        }
                        Ok(SocketEvent::Error { message, request_id }) => {
                            resolve(&pending, request_id, Err(TransportError::Server(message)));
                        }
                        Ok(other) => debug!("Ignoring '{}' from backend", other.name()),
                        Err(e) => warn!("Undecodable socket frame: {}", e),
                    }
                }
                info!("Socket disconnected");
                connected.store(false, Ordering::SeqCst);
                if let Some(waiter) = pending.lock().take() {
                    let _ = waiter.reply.send(Err(TransportError::Closed));
                }
            })
        };

        Ok(Self {
            outgoing,
            connected,
            pending,
            in_flight: tokio::sync::Mutex::new(()),
            next_request_id: AtomicU64::new(0),
            greeting,
            reply_timeout,
            tasks: vec![writer, reader],
        })
    }

    /// Model the backend announced in its greeting
    pub fn backend_model(&self) -> Option<String> {
        self.greeting.read().clone()
    }

    pub fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let _ = self.outgoing.send(Message::Close(None));
    }
}

/// Hand `result` to the waiter if it belongs to the request being waited on
fn resolve(pending: &Pending, request_id: Option<u64>, result: Result<ChatReply, TransportError>) {
    let mut pending = pending.lock();
    match pending.as_ref().map(|waiter| waiter.request_id) {
        Some(expected) if request_id.map_or(true, |id| id == expected) => {
            if let Some(waiter) = pending.take() {
                let _ = waiter.reply.send(result);
            }
        }
        Some(expected) => warn!(
            "Dropping socket reply for request {:?} while waiting on {}",
            request_id, expected
        ),
        None => warn!("Dropping socket reply nobody is waiting for"),
    }
}

#[async_trait]
impl ChatTransport for SocketTransport {
    fn name(&self) -> &str {
        "socket"
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
        let _in_flight = self.in_flight.lock().await;
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed) + 1;
        let frame = SocketEvent::ChatMessage(request.clone().with_request_id(request_id))
            .to_json()
            .map_err(|e| TransportError::Protocol(e.to_string()))?;

        let (tx, rx) = oneshot::channel();
        *self.pending.lock() = Some(Waiter { request_id, reply: tx });
        if self.outgoing.send(Message::Text(frame)).is_err() {
            self.pending.lock().take();
            return Err(TransportError::SendFailed("socket writer stopped".to_string()));
        }
        debug!("chat_message {} sent for {}", request_id, request.figure_id);

        match tokio::time::timeout(self.reply_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(TransportError::Closed),
            Err(_) => {
                self.pending.lock().take();
                Err(TransportError::Timeout(self.reply_timeout))
            }
        }
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

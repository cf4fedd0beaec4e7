//! Chat transports

pub mod http;
pub mod socket;

use crate::error::TransportError;
use async_trait::async_trait;
use serde::Serialize;
use sima_core::{ChatReply, ChatRequest};

/// A way of delivering a chat message and receiving the persona's reply
#[async_trait]
pub trait ChatTransport: Send + Sync {
    fn name(&self) -> &str;

    fn is_connected(&self) -> bool;

    /// Deliver `request` and wait for its reply
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, TransportError>;
}

/// Route a reply arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Socket,
    Http,
}

/// Connection summary for status displays
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransportStatus {
    /// `None` when no socket channel is configured
    pub socket_connected: Option<bool>,
    /// Route the next message will take
    pub preferred: Route,
    pub last_route: Option<Route>,
}

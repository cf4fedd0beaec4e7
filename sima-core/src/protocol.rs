//! Wire payloads shared by the HTTP API and the socket channel

use crate::error::{Error, Result};
use crate::persona::PersonaId;
use base64::Engine as _;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Maximum accepted chat message size in bytes
pub const MAX_MESSAGE_BYTES: usize = 10_000;

/// `POST /api/chat` body and `chat_message` socket payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub figure_id: String,
    pub message: String,
    /// Socket correlation id, echoed back on the matching reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

impl ChatRequest {
    pub fn new(figure_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            figure_id: figure_id.into(),
            message: message.into(),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: u64) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.figure_id.trim().is_empty() || self.message.trim().is_empty() {
            return Err(Error::InvalidRequest("figure_id ve message gerekli".to_string()));
        }
        if self.message.len() > MAX_MESSAGE_BYTES {
            return Err(Error::InvalidRequest(format!(
                "Message too long (max {} bytes)",
                MAX_MESSAGE_BYTES
            )));
        }
        if !PersonaId::from(self.figure_id.as_str()).is_well_formed() {
            return Err(Error::InvalidRequest("Geçersiz figür ID'si".to_string()));
        }
        Ok(())
    }
}

/// Persona reply, from `POST /api/chat` or the `ai_response` socket event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub figure_name: String,
    /// Base64 encoded MP3/WAV rendered by the backend, if any
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

impl ChatReply {
    /// Reply stamped with the current local time
    pub fn new(response: impl Into<String>, figure_name: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            figure_name: figure_name.into(),
            audio: None,
            timestamp: local_timestamp(),
            model: None,
            request_id: None,
        }
    }

    pub fn decode_audio(&self) -> Option<Bytes> {
        decode_base64_audio(self.audio.as_deref()?)
    }
}

/// `POST /api/tts` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsRequest {
    pub text: String,
}

/// `POST /api/tts` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsReply {
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub timestamp: String,
}

impl TtsReply {
    pub fn decode_audio(&self) -> Option<Bytes> {
        decode_base64_audio(self.audio.as_deref()?)
    }
}

/// `GET /` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub available_figures: Vec<String>,
}

/// Error body returned with 4xx/5xx statuses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Socket channel envelope: `{"event": "...", "data": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SocketEvent {
    /// Server greeting sent right after the channel opens
    Connected {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
    },
    /// Client -> server chat message
    ChatMessage(ChatRequest),
    /// Server -> client persona reply
    AiResponse(ChatReply),
    /// Server -> client failure for a chat message
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<u64>,
    },
}

impl SocketEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SocketEvent::Connected { .. } => "connected",
            SocketEvent::ChatMessage(_) => "chat_message",
            SocketEvent::AiResponse(_) => "ai_response",
            SocketEvent::Error { .. } => "error",
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Local time in ISO 8601 without offset, as the backend stamps replies
pub fn local_timestamp() -> String {
    chrono::Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

pub fn encode_base64_audio(audio: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(audio)
}

fn decode_base64_audio(encoded: &str) -> Option<Bytes> {
    if encoded.is_empty() {
        return None;
    }
    match base64::engine::general_purpose::STANDARD.decode(encoded) {
        Ok(raw) => Some(Bytes::from(raw)),
        Err(e) => {
            warn!("Ignoring undecodable reply audio: {}", e);
            None
        }
    }
}

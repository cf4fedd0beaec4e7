//! Error types for sima-chat

use sima_core::Error as CoreError;
use sima_me::AvatarError;
use sima_spk::SpeechError;
use std::time::Duration;
use thiserror::Error;

/// Failures talking to the backend
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Not connected")]
    NotConnected,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Connection closed while waiting for a reply")]
    Closed,

    #[error("No reply within {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Server returned {code}: {message}")]
    Status { code: u16, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Server error: {0}")]
    Server(String),
}

impl TransportError {
    /// The request never reached the backend, so another route may carry it
    pub fn is_undelivered(&self) -> bool {
        matches!(
            self,
            TransportError::NotConnected | TransportError::Connect(_) | TransportError::SendFailed(_)
        )
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Http(format!("request timed out: {}", err))
        } else {
            TransportError::Http(err.to_string())
        }
    }
}

impl From<TransportError> for CoreError {
    fn from(err: TransportError) -> Self {
        CoreError::Transport(err.to_string())
    }
}

/// Session-level errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("A message is already being sent")]
    Busy,

    #[error("No persona selected")]
    NoPersona,

    #[error("Unknown persona: {0}")]
    UnknownPersona(String),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The persona changed while the reply was in flight
    #[error("Reply discarded after persona change")]
    Superseded,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Speech(#[from] SpeechError),

    #[error(transparent)]
    Avatar(#[from] AvatarError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<SessionError> for CoreError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::UnknownPersona(id) => CoreError::UnknownPersona(id),
            SessionError::InvalidRequest(msg) => CoreError::InvalidRequest(msg),
            SessionError::Transport(e) => e.into(),
            SessionError::Core(e) => e,
            other => CoreError::InvalidRequest(other.to_string()),
        }
    }
}

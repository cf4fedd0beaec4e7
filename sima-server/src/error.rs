//! Error types for sima-server

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sima_core::{Error as CoreError, ErrorBody};
use thiserror::Error;

/// Reply generation errors
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("API key not set")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Authentication failed")]
    AuthenticationFailed,
}

/// Errors surfaced to HTTP clients
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unavailable(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Generation(GenerationError::RateLimit) => StatusCode::TOO_MANY_REQUESTS,
            ServerError::Generation(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sima_spk::SpeechError> for ServerError {
    fn from(err: sima_spk::SpeechError) -> Self {
        ServerError::Tts(err.to_string())
    }
}

impl From<CoreError> for ServerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidRequest(msg) => ServerError::BadRequest(msg),
            CoreError::UnknownPersona(_) => ServerError::BadRequest("Geçersiz figür ID'si".to_string()),
            CoreError::Configuration(msg) => ServerError::Config(msg),
            other => ServerError::Config(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

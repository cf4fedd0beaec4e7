//! Error types for sima-me

use sima_core::Error as CoreError;
use thiserror::Error;

/// Avatar errors
#[derive(Error, Debug)]
pub enum AvatarError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<hound::Error> for AvatarError {
    fn from(err: hound::Error) -> Self {
        AvatarError::Audio(err.to_string())
    }
}

impl From<AvatarError> for CoreError {
    fn from(err: AvatarError) -> Self {
        match err {
            AvatarError::Config(msg) => CoreError::Configuration(msg),
            other => CoreError::Speech(format!("Avatar error: {}", other)),
        }
    }
}

//! Chat history entries

use crate::protocol::ChatReply;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One rendered line of a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub text: String,
    pub is_user: bool,
    pub timestamp: DateTime<Utc>,
    pub figure_name: Option<String>,
    /// Base64 audio attached by the backend
    pub audio: Option<String>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            is_user: true,
            timestamp: Utc::now(),
            figure_name: None,
            audio: None,
        }
    }

    pub fn persona(reply: &ChatReply) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: reply.response.clone(),
            is_user: false,
            timestamp: Utc::now(),
            figure_name: Some(reply.figure_name.clone()),
            audio: reply.audio.clone(),
        }
    }

    /// Speaker label for transcripts
    pub fn speaker(&self) -> &str {
        if self.is_user {
            "Sen"
        } else {
            self.figure_name.as_deref().unwrap_or("?")
        }
    }
}

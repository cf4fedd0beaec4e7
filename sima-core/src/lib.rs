//! sima-core: Shared types for Tarih-i Sima
//!
//! - Persona catalogue (historical figures, example prompts, event tables)
//! - Chat messages and the HTTP / socket wire payloads
//! - Client configuration (file + environment)

pub mod error;
pub mod persona;
pub mod message;
pub mod protocol;
pub mod config;

pub use error::{Error, Result};
pub use persona::{Persona, PersonaId, PersonaCatalog, HistoricalEvent};
pub use message::ChatMessage;
pub use protocol::{ChatRequest, ChatReply, TtsRequest, TtsReply, ServiceInfo, ErrorBody, SocketEvent};
pub use config::{ClientConfig, SpeechSettings, AvatarSettings};

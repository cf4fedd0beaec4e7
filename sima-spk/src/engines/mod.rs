//! TTS engine implementations

pub mod native;
pub mod backend;
pub mod custom;

use crate::error::SpeechError;
use async_trait::async_trait;
use bytes::Bytes;

/// Maximum text accepted by any engine
pub const MAX_TEXT_BYTES: usize = 100_000;

/// Maximum audio an engine may hand back
pub const MAX_AUDIO_BYTES: usize = 10 * 1024 * 1024;

/// Trait for TTS engines
#[async_trait]
pub trait TtsEngine: Send + Sync {
    /// Synthesize text to speech audio
    async fn synthesize(&self, text: &str, config: &crate::config::VoiceConfig) -> Result<Bytes, SpeechError>;

    /// Get available voices
    async fn list_voices(&self) -> Result<Vec<String>, SpeechError>;

    /// Check if engine is available
    fn is_available(&self) -> bool;

    /// Get engine name
    fn name(&self) -> &str;
}

pub(crate) fn check_text(text: &str) -> Result<(), SpeechError> {
    if text.trim().is_empty() {
        return Err(SpeechError::Engine("Text cannot be empty".to_string()));
    }
    if text.len() > MAX_TEXT_BYTES {
        return Err(SpeechError::Engine("Text too long (max 100KB)".to_string()));
    }
    Ok(())
}

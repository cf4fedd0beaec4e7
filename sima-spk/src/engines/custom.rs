//! Custom TTS engine implementation
//! Allows embedding applications to plug in their own synthesis

use crate::config::VoiceConfig;
use crate::engines::{check_text, TtsEngine};
use crate::error::SpeechError;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

type SynthesizeFn = dyn Fn(&str, &VoiceConfig) -> Result<Bytes, SpeechError> + Send + Sync;

/// Custom TTS engine wrapper
pub struct CustomTtsEngine {
    name: String,
    synthesize_fn: Arc<SynthesizeFn>,
    voices: Vec<String>,
}

impl CustomTtsEngine {
    /// Create a new custom TTS engine
    pub fn new<F>(name: impl Into<String>, synthesize_fn: F) -> Self
    where
        F: Fn(&str, &VoiceConfig) -> Result<Bytes, SpeechError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            synthesize_fn: Arc::new(synthesize_fn),
            voices: Vec::new(),
        }
    }

    pub fn with_voices(mut self, voices: Vec<String>) -> Self {
        self.voices = voices;
        self
    }
}

#[async_trait]
impl TtsEngine for CustomTtsEngine {
    async fn synthesize(&self, text: &str, config: &VoiceConfig) -> Result<Bytes, SpeechError> {
        check_text(text)?;
        (self.synthesize_fn)(text, config)
    }

    async fn list_voices(&self) -> Result<Vec<String>, SpeechError> {
        Ok(self.voices.clone())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        &self.name
    }
}

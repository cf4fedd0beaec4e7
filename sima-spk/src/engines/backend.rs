//! Chat backend TTS engine (`POST /api/tts`)

use crate::config::{ApiTtsConfig, RetryConfig, VoiceConfig};
use crate::engines::{check_text, TtsEngine, MAX_AUDIO_BYTES};
use crate::error::SpeechError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use sima_core::{TtsReply, TtsRequest};
use std::time::Duration;
use tracing::debug;

/// Speech rendered by the backend server
pub struct BackendTtsEngine {
    client: Client,
    endpoint: String,
    retry_config: RetryConfig,
}

impl BackendTtsEngine {
    pub fn new(config: &ApiTtsConfig) -> Result<Self, SpeechError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SpeechError::Api(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            retry_config: config.retry_config.clone(),
        })
    }

    fn url(&self) -> String {
        format!("{}/api/tts", self.endpoint)
    }

    async fn request_once(&self, text: &str) -> Result<Bytes, SpeechError> {
        let response = self
            .client
            .post(self.url())
            .json(&TtsRequest { text: text.to_string() })
            .send()
            .await
            .map_err(|e| SpeechError::Api(format!("TTS request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Api(format!("TTS request returned {}: {}", status, body)));
        }

        let reply: TtsReply = response
            .json()
            .await
            .map_err(|e| SpeechError::Api(format!("Invalid TTS response: {}", e)))?;

        let audio = reply
            .decode_audio()
            .ok_or_else(|| SpeechError::Api("TTS response carried no audio".to_string()))?;
        if audio.len() > MAX_AUDIO_BYTES {
            return Err(SpeechError::Api(format!("TTS audio too large ({} bytes)", audio.len())));
        }
        Ok(audio)
    }

    /// Retry with exponential backoff
    async fn retry_request<F, Fut>(&self, f: F) -> Result<Bytes, SpeechError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<Bytes, SpeechError>>,
    {
        let mut delay = self.retry_config.initial_delay_ms;
        let mut last_error = None;

        for attempt in 0..=self.retry_config.max_retries {
            match f().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.retry_config.max_retries {
                        debug!(
                            "TTS request failed, retrying in {}ms (attempt {}/{})",
                            delay,
                            attempt + 1,
                            self.retry_config.max_retries
                        );
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        delay = delay
                            .checked_mul(2)
                            .map(|d| d.min(self.retry_config.max_delay_ms))
                            .unwrap_or(self.retry_config.max_delay_ms);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SpeechError::Api("Unknown error".to_string())))
    }
}

#[async_trait]
impl TtsEngine for BackendTtsEngine {
    async fn synthesize(&self, text: &str, _config: &VoiceConfig) -> Result<Bytes, SpeechError> {
        check_text(text)?;
        self.retry_request(|| self.request_once(text)).await
    }

    async fn list_voices(&self) -> Result<Vec<String>, SpeechError> {
        // The backend picks its own voice
        Ok(vec!["default".to_string()])
    }

    fn is_available(&self) -> bool {
        !self.endpoint.is_empty()
    }

    fn name(&self) -> &str {
        "backend"
    }
}

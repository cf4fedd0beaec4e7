//! Configuration for speech synthesis

use serde::{Deserialize, Serialize};
use sima_core::config::SpeechSettings;

/// Words per minute at utterance rate 1.0
pub const BASE_RATE_WPM: u32 = 150;

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Enable speech synthesis
    pub enabled: bool,

    /// Preferred TTS engine
    pub engine: TtsEngine,

    /// Voice settings
    pub voice: VoiceConfig,

    /// Speech rate (words per minute, 0-500, default 150)
    pub rate: u32,

    /// Volume (0.0-1.0, default 1.0)
    pub volume: f32,

    /// Pitch adjustment (-1.0 to 1.0, default 0.0)
    pub pitch: f32,

    /// Backend TTS endpoint (if using the chat backend)
    pub api_config: Option<ApiTtsConfig>,

    /// Enable audio caching
    pub enable_cache: bool,

    /// Maximum cache size in MB
    pub max_cache_size_mb: u64,

    /// Concurrent synthesis requests
    pub queue_size: usize,
}

/// TTS Engine type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum TtsEngine {
    /// Native platform TTS (Linux espeak-ng, macOS say)
    Native,
    /// The chat backend's `/api/tts` endpoint
    Backend,
    /// Custom engine supplied by the embedding application
    Custom(String),
}

/// Voice configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Voice name/identifier
    pub name: Option<String>,

    /// Language code (e.g., "tr-TR", "en-US")
    pub language: String,
}

/// Backend TTS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiTtsConfig {
    /// Backend base URL
    pub endpoint: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Retry configuration
    pub retry_config: RetryConfig,
}

/// Retry configuration for API calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retry attempts
    pub max_retries: u32,

    /// Initial retry delay in milliseconds
    pub initial_delay_ms: u64,

    /// Maximum retry delay in milliseconds
    pub max_delay_ms: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            engine: TtsEngine::Native,
            voice: VoiceConfig::default(),
            rate: BASE_RATE_WPM,
            volume: 1.0,
            pitch: 0.0,
            api_config: None,
            enable_cache: true,
            max_cache_size_mb: 64,
            queue_size: 4,
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            name: None,
            language: "tr-TR".to_string(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

impl ApiTtsConfig {
    pub fn for_backend(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_secs,
            retry_config: RetryConfig::default(),
        }
    }
}

impl SpeechConfig {
    /// Map client speech settings (utterance units) onto synthesizer units
    pub fn from_settings(settings: &SpeechSettings) -> Self {
        let rate = (BASE_RATE_WPM as f32 * settings.rate).round().clamp(0.0, 500.0) as u32;
        Self {
            enabled: settings.enabled,
            voice: VoiceConfig {
                name: settings.voice.clone(),
                language: settings.language.clone(),
            },
            rate,
            volume: settings.volume.clamp(0.0, 1.0),
            pitch: (settings.pitch - 1.0).clamp(-1.0, 1.0),
            ..Self::default()
        }
    }

    /// Use the backend `/api/tts` endpoint as engine
    pub fn with_backend(mut self, endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        self.engine = TtsEngine::Backend;
        self.api_config = Some(ApiTtsConfig::for_backend(endpoint, timeout_secs));
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.rate > 500 {
            return Err("Speech rate must be between 0 and 500 WPM".to_string());
        }

        if !(0.0..=1.0).contains(&self.volume) {
            return Err("Volume must be between 0.0 and 1.0".to_string());
        }

        if !(-1.0..=1.0).contains(&self.pitch) {
            return Err("Pitch must be between -1.0 and 1.0".to_string());
        }

        if self.queue_size == 0 {
            return Err("Queue size must be greater than 0".to_string());
        }

        if self.queue_size > 1000 {
            return Err("Queue size too large (max 1000)".to_string());
        }

        const MAX_CACHE_SIZE_MB: u64 = 1_000;
        if self.max_cache_size_mb > MAX_CACHE_SIZE_MB {
            return Err(format!("Cache size too large (max {} MB)", MAX_CACHE_SIZE_MB));
        }

        self.voice.validate()?;

        if self.engine == TtsEngine::Backend && self.api_config.is_none() {
            return Err("Backend TTS requires api_config".to_string());
        }

        if let Some(api_config) = &self.api_config {
            if !(api_config.endpoint.starts_with("http://") || api_config.endpoint.starts_with("https://")) {
                return Err("TTS endpoint must be an http(s) URL".to_string());
            }
            if url::Url::parse(&api_config.endpoint).is_err() {
                return Err("TTS endpoint is not a valid URL".to_string());
            }
            if api_config.timeout_secs == 0 || api_config.timeout_secs > 300 {
                return Err("TTS timeout must be between 1 and 300 seconds".to_string());
            }
            api_config.retry_config.validate()?;
        }

        Ok(())
    }
}

impl VoiceConfig {
    /// Validate voice configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.language.is_empty() {
            return Err("Language code cannot be empty".to_string());
        }

        if self.language.len() > 32 {
            return Err("Language code too long (max 32 chars)".to_string());
        }

        if !self.language.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err("Language code contains invalid characters (only alphanumeric and '-' allowed)".to_string());
        }

        if let Some(ref name) = self.name {
            if name.is_empty() || name.len() > 256 {
                return Err("Voice name must be 1-256 chars".to_string());
            }
            if name.chars().any(|c| c.is_control()) {
                return Err("Voice name contains invalid characters".to_string());
            }
        }

        Ok(())
    }

    /// espeak-ng voice argument: explicit name, else the language ("tr-TR" -> "tr")
    pub fn espeak_voice(&self) -> String {
        match self.name {
            Some(ref name) => name.clone(),
            None => self
                .language
                .split('-')
                .next()
                .unwrap_or("tr")
                .to_ascii_lowercase(),
        }
    }
}

impl RetryConfig {
    /// Validate retry configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_retries > 10 {
            return Err("Max retries too large (max 10)".to_string());
        }

        if self.initial_delay_ms > self.max_delay_ms {
            return Err("Initial delay cannot be greater than max delay".to_string());
        }

        if self.max_delay_ms > 60_000 {
            return Err("Max delay too large (max 60000 ms)".to_string());
        }

        Ok(())
    }
}

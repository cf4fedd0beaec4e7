//! Server configuration

use serde::{Deserialize, Serialize};

/// Backend server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// OpenAI API key; without one the server answers from the scripted generator
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,

    /// Chat completions base URL
    pub openai_base_url: String,

    pub openai_model: String,

    /// Completion length limit
    pub max_tokens: u32,

    pub temperature: f32,

    /// Render reply audio with the native TTS engine
    pub enable_tts: bool,

    /// Upstream request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-3.5-turbo".to_string(),
            max_tokens: 500,
            temperature: 0.7,
            enable_tts: true,
            request_timeout_secs: 120,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `PORT`, `HOST`, `OPENAI_API_KEY`, `SIMA_MODEL`, `SIMA_TTS`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            config.port = port;
        }
        if let Ok(host) = std::env::var("HOST") {
            config.host = host;
        }
        config.openai_api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty());
        if let Ok(model) = std::env::var("SIMA_MODEL") {
            config.openai_model = model;
        }
        if let Ok(flag) = std::env::var("SIMA_TTS") {
            config.enable_tts = !matches!(flag.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off" | "no");
        }
        config
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("Host cannot be empty".to_string());
        }
        if !self.openai_base_url.starts_with("https://") && !self.openai_base_url.starts_with("http://") {
            return Err("OpenAI base URL must be an http(s) URL".to_string());
        }
        if self.openai_model.is_empty()
            || !self
                .openai_model
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err("Model name contains invalid characters".to_string());
        }
        if self.max_tokens == 0 || self.max_tokens > 4096 {
            return Err("max_tokens must be between 1 and 4096".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err("temperature must be between 0.0 and 2.0".to_string());
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 600 {
            return Err("request_timeout_secs must be between 1 and 600".to_string());
        }
        Ok(())
    }
}

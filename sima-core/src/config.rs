//! Client configuration
//!
//! Loaded from `config.toml` (or JSON) in the user config directory, then
//! overridden by `SIMA_*` environment variables.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend base URL for the HTTP API
    pub api_url: String,

    /// Socket channel URL
    pub socket_url: String,

    /// Use the socket channel when it is connected
    pub socket_enabled: bool,

    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,

    /// How long to wait for an `ai_response` after emitting a message
    pub reply_timeout_secs: u64,

    pub speech: SpeechSettings,

    pub avatar: AvatarSettings,
}

/// Speech playback settings (rate/pitch/volume in utterance units, 1.0 = normal)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub enabled: bool,
    pub language: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub voice: Option<String>,
}

/// Avatar animation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarSettings {
    /// Speaking pulse when a reply cannot be spoken
    pub fallback_speaking_ms: u64,
    /// Speaking pulse after an HTTP fallback reply when speech is off
    pub http_speaking_ms: u64,
    /// Entrance animation length
    pub entrance_ms: u64,
    /// Drive mouth shapes from reply audio
    pub lip_sync: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000".to_string(),
            socket_url: "ws://localhost:5000/ws".to_string(),
            socket_enabled: true,
            request_timeout_secs: 30,
            reply_timeout_secs: 60,
            speech: SpeechSettings::default(),
            avatar: AvatarSettings::default(),
        }
    }
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            language: "tr-TR".to_string(),
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            voice: None,
        }
    }
}

impl Default for AvatarSettings {
    fn default() -> Self {
        Self {
            fallback_speaking_ms: 1200,
            http_speaking_ms: 3000,
            entrance_ms: 1000,
            lip_sync: true,
        }
    }
}

impl ClientConfig {
    /// Default config file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("sima").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("sima.toml"))
    }

    /// Load file (if present), apply environment overrides, validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env();
        config.validate().map_err(Error::Configuration)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse JSON or TOML content
    pub fn from_str(content: &str) -> Result<Self> {
        if let Ok(config) = serde_json::from_str::<ClientConfig>(content) {
            return Ok(config);
        }
        toml::from_str::<ClientConfig>(content)
            .map_err(|e| Error::Configuration(format!("Parse error: {}", e)))
    }

    /// Configuration from defaults plus environment
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("SIMA_API_URL") {
            self.api_url = url;
        }
        if let Ok(url) = std::env::var("SIMA_SOCKET_URL") {
            self.socket_url = url;
        }
        if let Ok(flag) = std::env::var("SIMA_SOCKET_ENABLED") {
            if let Some(v) = parse_flag(&flag) {
                self.socket_enabled = v;
            }
        }
        if let Ok(flag) = std::env::var("SIMA_SPEECH_ENABLED") {
            if let Some(v) = parse_flag(&flag) {
                self.speech.enabled = v;
            }
        }
        if let Ok(lang) = std::env::var("SIMA_LANGUAGE") {
            self.speech.language = lang;
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err("api_url must be an http(s) URL".to_string());
        }
        if !(self.socket_url.starts_with("ws://") || self.socket_url.starts_with("wss://")) {
            return Err("socket_url must be a ws(s) URL".to_string());
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 300 {
            return Err("request_timeout_secs must be between 1 and 300".to_string());
        }
        if self.reply_timeout_secs == 0 || self.reply_timeout_secs > 600 {
            return Err("reply_timeout_secs must be between 1 and 600".to_string());
        }
        self.speech.validate()?;

        if self.avatar.fallback_speaking_ms > 60_000 || self.avatar.http_speaking_ms > 60_000 {
            return Err("Speaking pulse too long (max 60000 ms)".to_string());
        }
        Ok(())
    }
}

impl SpeechSettings {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.language.is_empty() || self.language.len() > 32 {
            return Err("Language code must be 1-32 chars".to_string());
        }
        if !self.language.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err("Language code contains invalid characters".to_string());
        }
        // Same bounds the browser utterance accepts
        if !(0.1..=10.0).contains(&self.rate) {
            return Err("Rate must be between 0.1 and 10.0".to_string());
        }
        if !(0.0..=2.0).contains(&self.pitch) {
            return Err("Pitch must be between 0.0 and 2.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err("Volume must be between 0.0 and 1.0".to_string());
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.speech.language, "tr-TR");
        assert_eq!(config.avatar.fallback_speaking_ms, 1200);
        assert_eq!(config.avatar.http_speaking_ms, 3000);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}

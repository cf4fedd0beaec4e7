//! Configuration for the avatar

use serde::{Deserialize, Serialize};
use sima_core::config::AvatarSettings;
use std::time::Duration;

/// Avatar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    /// Speaking pulse when a reply arrives but cannot be spoken
    pub fallback_speaking_ms: u64,

    /// Speaking pulse after an HTTP reply when speech is off
    pub http_speaking_ms: u64,

    /// Entrance animation length
    pub entrance_ms: u64,

    /// Drive mouth shapes from utterance audio
    pub lip_sync: bool,

    /// Samples per lip-sync analysis window
    pub window_size: usize,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            fallback_speaking_ms: 1200,
            http_speaking_ms: 3000,
            entrance_ms: 1000,
            lip_sync: true,
            window_size: 512,
        }
    }
}

impl AvatarConfig {
    pub fn from_settings(settings: &AvatarSettings) -> Self {
        Self {
            fallback_speaking_ms: settings.fallback_speaking_ms,
            http_speaking_ms: settings.http_speaking_ms,
            entrance_ms: settings.entrance_ms,
            lip_sync: settings.lip_sync,
            ..Self::default()
        }
    }

    pub fn fallback_speaking(&self) -> Duration {
        Duration::from_millis(self.fallback_speaking_ms)
    }

    pub fn http_speaking(&self) -> Duration {
        Duration::from_millis(self.http_speaking_ms)
    }

    pub fn entrance(&self) -> Duration {
        Duration::from_millis(self.entrance_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        const MAX_PULSE_MS: u64 = 60_000;
        if self.fallback_speaking_ms > MAX_PULSE_MS || self.http_speaking_ms > MAX_PULSE_MS {
            return Err(format!("Speaking pulse too long (max {} ms)", MAX_PULSE_MS));
        }
        if self.entrance_ms > 10_000 {
            return Err("Entrance animation too long (max 10000 ms)".to_string());
        }
        if !(64..=8192).contains(&self.window_size) {
            return Err("Lip-sync window must be between 64 and 8192 samples".to_string());
        }
        Ok(())
    }
}

//! Speech synthesizer with caching and queue management

use crate::config::{SpeechConfig, TtsEngine as EngineKind, VoiceConfig};
use crate::engines::backend::BackendTtsEngine;
use crate::engines::native::NativeTtsEngine;
use crate::engines::{TtsEngine, MAX_AUDIO_BYTES, MAX_TEXT_BYTES};
use crate::error::SpeechError;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Speech synthesizer with caching and queue management
pub struct SpeechSynthesizer {
    config: Arc<SpeechConfig>,
    engine: Arc<dyn TtsEngine>,
    cache: Arc<RwLock<HashMap<String, CachedAudio>>>,
    queue_semaphore: Arc<Semaphore>,
}

#[derive(Clone)]
struct CachedAudio {
    audio: Bytes,
    timestamp: chrono::DateTime<chrono::Utc>,
    size_bytes: usize,
}

impl SpeechSynthesizer {
    /// Create a synthesizer for the engine named in `config`
    pub fn new(config: SpeechConfig) -> Result<Self, SpeechError> {
        config.validate().map_err(SpeechError::Config)?;

        let engine: Arc<dyn TtsEngine> = match config.engine {
            EngineKind::Native => {
                let native = NativeTtsEngine::new_with_config(config.rate, config.volume, config.pitch);
                if !native.is_available() {
                    return Err(SpeechError::Engine("Native TTS engine not available".to_string()));
                }
                Arc::new(native)
            }
            EngineKind::Backend => {
                let api_config = config
                    .api_config
                    .as_ref()
                    .ok_or_else(|| SpeechError::Config("Backend TTS requires api_config".to_string()))?;
                Arc::new(BackendTtsEngine::new(api_config)?)
            }
            EngineKind::Custom(ref name) => {
                return Err(SpeechError::Engine(format!(
                    "Custom TTS engine '{}' must be supplied with SpeechSynthesizer::with_engine",
                    name
                )));
            }
        };

        Self::with_engine(config, engine)
    }

    /// Create a synthesizer around an already constructed engine
    pub fn with_engine(config: SpeechConfig, engine: Arc<dyn TtsEngine>) -> Result<Self, SpeechError> {
        config.validate().map_err(SpeechError::Config)?;

        if !config.enabled {
            return Err(SpeechError::Config("Speech synthesis is disabled".to_string()));
        }

        info!("Speech synthesizer using '{}' engine", engine.name());
        let queue_semaphore = Arc::new(Semaphore::new(config.queue_size));

        Ok(Self {
            config: Arc::new(config),
            engine,
            cache: Arc::new(RwLock::new(HashMap::new())),
            queue_semaphore,
        })
    }

    pub fn config(&self) -> &SpeechConfig {
        &self.config
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Synthesize text with the configured voice
    pub async fn speak(&self, text: &str) -> Result<Bytes, SpeechError> {
        self.speak_with_config(text, &self.config.voice).await
    }

    /// Synthesize text with a custom voice config
    ///
    /// Waits for a queue slot when `queue_size` requests are already running.
    pub async fn speak_with_config(&self, text: &str, voice_config: &VoiceConfig) -> Result<Bytes, SpeechError> {
        let _permit = self
            .queue_semaphore
            .acquire()
            .await
            .map_err(|e| SpeechError::Synthesizer(format!("Failed to acquire queue permit: {}", e)))?;

        self.synthesize_internal(text, voice_config).await
    }

    pub async fn list_voices(&self) -> Result<Vec<String>, SpeechError> {
        self.engine.list_voices().await
    }

    async fn synthesize_internal(&self, text: &str, voice_config: &VoiceConfig) -> Result<Bytes, SpeechError> {
        if text.trim().is_empty() {
            return Err(SpeechError::Synthesizer("Text cannot be empty".to_string()));
        }
        if text.contains('\0') {
            return Err(SpeechError::Synthesizer("Text contains null bytes".to_string()));
        }
        if text.len() > MAX_TEXT_BYTES {
            return Err(SpeechError::Synthesizer(format!("Text too long (max {} bytes)", MAX_TEXT_BYTES)));
        }
        voice_config.validate().map_err(SpeechError::Synthesizer)?;

        let cache_key = self.cache_key(text, voice_config);
        if self.config.enable_cache {
            if let Some(cached) = self.cache.read().get(&cache_key) {
                debug!("Cache hit for text: {}", preview(text));
                return Ok(cached.audio.clone());
            }
        }

        let audio = self.engine.synthesize(text, voice_config).await?;
        if audio.len() > MAX_AUDIO_BYTES {
            return Err(SpeechError::Synthesizer(format!(
                "Generated audio too large ({} bytes, max {} bytes)",
                audio.len(),
                MAX_AUDIO_BYTES
            )));
        }

        if self.config.enable_cache {
            self.cache.write().insert(
                cache_key,
                CachedAudio {
                    audio: audio.clone(),
                    timestamp: chrono::Utc::now(),
                    size_bytes: audio.len(),
                },
            );
            self.cleanup_cache();
        }
        Ok(audio)
    }

    fn cache_key(&self, text: &str, voice_config: &VoiceConfig) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.engine.name().as_bytes());
        hasher.update([0]);
        hasher.update(text.as_bytes());
        hasher.update([0]);
        hasher.update(voice_config.language.as_bytes());
        if let Some(ref name) = voice_config.name {
            hasher.update([0]);
            hasher.update(name.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    /// Evict oldest entries until the cache is back under 80% of its limit
    fn cleanup_cache(&self) {
        let max_size_bytes = (self.config.max_cache_size_mb as usize).saturating_mul(1024 * 1024);
        let mut cache = self.cache.write();

        let mut total_size: usize = cache.values().map(|c| c.size_bytes).sum();
        if total_size <= max_size_bytes {
            return;
        }

        let target_size = max_size_bytes / 100 * 80;
        let mut entries: Vec<_> = cache
            .iter()
            .map(|(k, v)| (k.clone(), v.timestamp, v.size_bytes))
            .collect();
        entries.sort_by_key(|(_, timestamp, _)| *timestamp);

        let mut removed = 0usize;
        for (key, _, size) in entries {
            if total_size <= target_size {
                break;
            }
            cache.remove(&key);
            total_size -= size;
            removed += 1;
        }
        info!("Cleaned up speech cache: removed {} entries", removed);
    }

    pub fn cache_len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    /// Number of synthesis requests currently running
    pub fn queue_usage(&self) -> usize {
        let available = self.queue_semaphore.available_permits();
        self.config.queue_size.saturating_sub(available)
    }

    pub fn queue_capacity(&self) -> usize {
        self.config.queue_size
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > 50 {
        format!("{}...", text.chars().take(50).collect::<String>())
    } else {
        text.to_string()
    }
}

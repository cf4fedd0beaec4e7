//! Native platform TTS engine
//!
//! Drives `espeak-ng` on Linux and `say` on macOS, rendering to a temporary
//! file and returning its bytes.

use crate::config::VoiceConfig;
use crate::engines::{check_text, TtsEngine, MAX_AUDIO_BYTES};
use crate::error::SpeechError;
use async_trait::async_trait;
use bytes::Bytes;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Espeak,
    Say,
}

impl Backend {
    fn program(self) -> &'static str {
        match self {
            Backend::Espeak => "espeak-ng",
            Backend::Say => "say",
        }
    }
}

/// Native TTS engine (platform-specific)
pub struct NativeTtsEngine {
    backend: Option<Backend>,
    rate: u32,
    volume: f32,
    pitch: f32,
}

impl NativeTtsEngine {
    pub fn new() -> Self {
        Self::new_with_config(crate::config::BASE_RATE_WPM, 1.0, 0.0)
    }

    pub fn new_with_config(rate: u32, volume: f32, pitch: f32) -> Self {
        let backend = detect();
        match backend {
            Some(b) => info!("Native TTS engine initialized ({})", b.program()),
            None => warn!("No native TTS program found (espeak-ng / say)"),
        }
        Self { backend, rate, volume, pitch }
    }

    fn command(&self, backend: Backend, text: &str, config: &VoiceConfig, out: &std::path::Path) -> Command {
        let mut cmd = Command::new(backend.program());
        match backend {
            Backend::Espeak => {
                cmd.arg("-v").arg(sanitize_voice(&config.espeak_voice()));
                cmd.arg("-s").arg(self.rate.to_string());
                // espeak-ng amplitude: 0-200, 100 is normal
                let amplitude = (self.volume * 200.0).round().clamp(0.0, 200.0) as u32;
                cmd.arg("-a").arg(amplitude.to_string());
                // espeak-ng pitch: 0-99, 50 is normal
                let pitch = (50.0 + self.pitch * 49.0).round().clamp(0.0, 99.0) as u32;
                cmd.arg("-p").arg(pitch.to_string());
                cmd.arg("-w").arg(out);
            }
            Backend::Say => {
                if let Some(ref voice) = config.name {
                    let voice = sanitize_voice(voice);
                    if !voice.is_empty() {
                        cmd.arg("-v").arg(voice);
                    }
                }
                cmd.arg("-r").arg(self.rate.min(500).to_string());
                cmd.arg("--file-format=WAVE").arg("--data-format=LEI16@22050");
                cmd.arg("-o").arg(out);
            }
        }
        // Text goes after `--` so it can never be read as an option
        cmd.arg("--").arg(text);
        cmd
    }
}

impl Default for NativeTtsEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TtsEngine for NativeTtsEngine {
    async fn synthesize(&self, text: &str, config: &VoiceConfig) -> Result<Bytes, SpeechError> {
        check_text(text)?;
        let backend = self
            .backend
            .ok_or_else(|| SpeechError::Engine("Native TTS engine not available".to_string()))?;

        let sanitized: String = text
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();

        let temp_file = NamedTempFile::new()?;
        let output = self
            .command(backend, &sanitized, config, temp_file.path())
            .output()
            .await
            .map_err(|e| SpeechError::Engine(format!("Failed to run {}: {}", backend.program(), e)))?;

        if !output.status.success() {
            return Err(SpeechError::Engine(format!(
                "{} failed: {}",
                backend.program(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let audio = tokio::fs::read(temp_file.path()).await?;
        if audio.is_empty() {
            return Err(SpeechError::Engine(format!("{} produced no audio", backend.program())));
        }
        if audio.len() > MAX_AUDIO_BYTES {
            return Err(SpeechError::Engine(format!(
                "Generated audio too large ({} bytes, max {} bytes)",
                audio.len(),
                MAX_AUDIO_BYTES
            )));
        }
        debug!("Synthesized {} bytes with {}", audio.len(), backend.program());
        Ok(Bytes::from(audio))
    }

    async fn list_voices(&self) -> Result<Vec<String>, SpeechError> {
        let Some(backend) = self.backend else {
            return Ok(vec![]);
        };
        let args: &[&str] = match backend {
            Backend::Espeak => &["--voices"],
            Backend::Say => &["-v", "?"],
        };
        let output = Command::new(backend.program())
            .args(args)
            .output()
            .await
            .map_err(|e| SpeechError::Engine(format!("Failed to list voices: {}", e)))?;
        if !output.status.success() {
            return Err(SpeechError::Engine("Failed to list voices".to_string()));
        }
        let listing = String::from_utf8_lossy(&output.stdout);
        Ok(parse_voice_listing(backend, &listing))
    }

    fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    fn name(&self) -> &str {
        "native"
    }
}

fn detect() -> Option<Backend> {
    let candidates: &[Backend] = if cfg!(target_os = "macos") {
        &[Backend::Say, Backend::Espeak]
    } else {
        &[Backend::Espeak]
    };
    candidates.iter().copied().find(|b| {
        let probe = match b {
            Backend::Espeak => "--version",
            Backend::Say => "-v?",
        };
        std::process::Command::new(b.program())
            .arg(probe)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .is_ok()
    })
}

fn sanitize_voice(voice: &str) -> String {
    voice
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '+' | '.'))
        .take(256)
        .collect()
}

fn parse_voice_listing(backend: Backend, listing: &str) -> Vec<String> {
    match backend {
        // Pty Language Age/Gender VoiceName File Other Languages
        Backend::Espeak => listing
            .lines()
            .skip(1)
            .filter_map(|line| line.split_whitespace().nth(1))
            .map(str::to_string)
            .collect(),
        // "Yelda    tr_TR    # Merhaba..."
        Backend::Say => listing
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .map(str::to_string)
            .collect(),
    }
}

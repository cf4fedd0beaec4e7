//! Audio output

use crate::error::SpeechError;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::Cursor;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info};

/// Shortest speaking time reported for any utterance
pub const MIN_UTTERANCE: Duration = Duration::from_millis(400);

/// Something that can play encoded audio to completion
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Play `audio`, resolving once playback has finished
    async fn play(&self, audio: &Bytes) -> Result<(), SpeechError>;

    fn name(&self) -> &str;
}

/// Plays audio through a system player program
pub struct CommandSink {
    program: String,
    args: Vec<String>,
}

impl CommandSink {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// First player found on this machine
    pub fn detect() -> Option<Self> {
        let candidates: &[(&str, &[&str])] = &[
            ("afplay", &[]),
            ("paplay", &[]),
            ("aplay", &["-q"]),
            ("ffplay", &["-nodisp", "-autoexit", "-loglevel", "quiet"]),
        ];
        let found = candidates.iter().find(|(program, _)| on_path(program))?;
        info!("Audio playback through {}", found.0);
        Some(Self::new(
            found.0,
            found.1.iter().map(|s| s.to_string()).collect(),
        ))
    }
}

#[async_trait]
impl AudioSink for CommandSink {
    async fn play(&self, audio: &Bytes) -> Result<(), SpeechError> {
        if audio.is_empty() {
            return Err(SpeechError::Playback("No audio to play".to_string()));
        }
        let temp_file = NamedTempFile::new()?;
        tokio::fs::write(temp_file.path(), audio).await?;

        // Dropping the future (cancellation) kills the player
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(temp_file.path())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| SpeechError::Playback(format!("Failed to start {}: {}", self.program, e)))?;

        if !status.success() {
            return Err(SpeechError::Playback(format!("{} exited with {}", self.program, status)));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// Plays nothing but takes as long as the audio would
///
/// Used when no player exists (or sound is muted) so the avatar still
/// animates for a believable time.
pub struct SilentSink {
    fallback: Duration,
}

impl SilentSink {
    pub fn new(fallback: Duration) -> Self {
        Self { fallback }
    }
}

impl Default for SilentSink {
    fn default() -> Self {
        Self::new(Duration::from_millis(1200))
    }
}

#[async_trait]
impl AudioSink for SilentSink {
    async fn play(&self, audio: &Bytes) -> Result<(), SpeechError> {
        let duration = wav_duration(audio).unwrap_or(self.fallback);
        debug!("Silent playback for {:?}", duration);
        tokio::time::sleep(duration).await;
        Ok(())
    }

    fn name(&self) -> &str {
        "silent"
    }
}

/// Length of a WAV clip, `None` for anything hound cannot read
pub fn wav_duration(audio: &[u8]) -> Option<Duration> {
    let reader = hound::WavReader::new(Cursor::new(audio)).ok()?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return None;
    }
    let frames = reader.duration() as u64;
    Some(Duration::from_millis(frames * 1000 / spec.sample_rate as u64))
}

/// Rough speaking time for `text` at `rate_wpm` words per minute
pub fn estimate_duration(text: &str, rate_wpm: u32) -> Duration {
    let words = text.split_whitespace().count() as u64;
    let rate = rate_wpm.max(1) as u64;
    Duration::from_millis(words * 60_000 / rate).max(MIN_UTTERANCE)
}

fn on_path(program: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

//! Mouth shapes from utterance audio

use crate::error::AvatarError;
use crate::state::MouthShape;
use std::io::Cursor;
use std::time::Duration;

/// Per-window mouth shapes for one clip
#[derive(Debug, Clone, PartialEq)]
pub struct LipSyncTrack {
    frames: Vec<MouthShape>,
    frame_duration: Duration,
}

impl LipSyncTrack {
    /// Analyse WAV audio in windows of `window_size` frames
    ///
    /// Multi-channel audio is analysed on its first channel.
    pub fn from_wav(audio: &[u8], window_size: usize) -> Result<Self, AvatarError> {
        if window_size == 0 {
            return Err(AvatarError::Config("window size must be positive".to_string()));
        }
        let reader = hound::WavReader::new(Cursor::new(audio))?;
        let spec = reader.spec();
        if spec.sample_rate == 0 || spec.channels == 0 {
            return Err(AvatarError::Audio("WAV header has no sample rate".to_string()));
        }

        let channels = spec.channels as usize;
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .step_by(channels)
                .collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .into_samples::<i32>()
                    .step_by(channels)
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()?
            }
        };

        let frames = samples
            .chunks(window_size)
            .map(|window| MouthShape::from_level(rms(window) * 100.0))
            .collect();
        let frame_duration = Duration::from_micros(window_size as u64 * 1_000_000 / spec.sample_rate as u64);

        Ok(Self { frames, frame_duration })
    }

    pub fn frames(&self) -> &[MouthShape] {
        &self.frames
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    pub fn duration(&self) -> Duration {
        self.frame_duration * self.frames.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Shape at `elapsed` playback time; closed once the clip is over
    pub fn shape_at(&self, elapsed: Duration) -> MouthShape {
        if self.frame_duration.is_zero() {
            return MouthShape::Closed;
        }
        let index = (elapsed.as_micros() / self.frame_duration.as_micros()) as usize;
        self.frames.get(index).copied().unwrap_or(MouthShape::Closed)
    }
}

fn rms(window: &[f32]) -> f32 {
    if window.is_empty() {
        return 0.0;
    }
    let sum: f32 = window.iter().map(|s| s * s).sum();
    (sum / window.len() as f32).sqrt()
}

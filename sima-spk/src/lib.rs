//! sima-spk: Speech output for persona replies
//!
//! Provides text-to-speech with:
//! - Native TTS engines (espeak-ng / say) and the chat backend's `/api/tts`
//! - A synthesizer with an audio cache and bounded concurrency
//! - A single-active-utterance queue reporting start/end/error events

pub mod error;
pub mod config;
pub mod engines;
pub mod synthesizer;
pub mod sink;
pub mod queue;

pub use error::SpeechError;
pub use config::{SpeechConfig, VoiceConfig, TtsEngine};
pub use synthesizer::SpeechSynthesizer;
pub use sink::{AudioSink, CommandSink, SilentSink, estimate_duration, wav_duration};
pub use queue::{SpeechQueue, Utterance, UtteranceEvent, UtteranceId};
pub use engines::TtsEngine as TtsEngineTrait;

//! Single-active-utterance speech queue
//!
//! Starting an utterance cancels whatever is currently speaking. Every
//! utterance ends with exactly one of `Ended`, `Failed` or `Cancelled`, and
//! `Started` is only reported for the utterance that is still current.

use crate::error::SpeechError;
use crate::sink::AudioSink;
use crate::synthesizer::SpeechSynthesizer;
use bytes::Bytes;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Identifier handed out by [`SpeechQueue::speak`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Text to speak, optionally with audio the backend already rendered
#[derive(Debug, Clone)]
pub struct Utterance {
    pub text: String,
    pub audio: Option<Bytes>,
}

impl Utterance {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            audio: None,
        }
    }

    pub fn with_audio(mut self, audio: Option<Bytes>) -> Self {
        self.audio = audio;
        self
    }
}

/// Lifecycle notifications for utterances
#[derive(Debug, Clone, PartialEq)]
pub enum UtteranceEvent {
    /// Audio is ready and playback begins
    Started { id: UtteranceId, audio: Option<Bytes> },
    Ended { id: UtteranceId },
    Failed { id: UtteranceId, error: String },
    Cancelled { id: UtteranceId },
}

impl UtteranceEvent {
    pub fn id(&self) -> UtteranceId {
        match self {
            UtteranceEvent::Started { id, .. }
            | UtteranceEvent::Ended { id }
            | UtteranceEvent::Failed { id, .. }
            | UtteranceEvent::Cancelled { id } => *id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, UtteranceEvent::Started { .. })
    }
}

struct Active {
    id: UtteranceId,
    handle: JoinHandle<()>,
}

type Slot = Arc<Mutex<Option<Active>>>;

/// Plays one utterance at a time
pub struct SpeechQueue {
    synthesizer: Option<Arc<SpeechSynthesizer>>,
    sink: Arc<dyn AudioSink>,
    events: broadcast::Sender<UtteranceEvent>,
    current: Slot,
    next_id: AtomicU64,
}

impl SpeechQueue {
    /// `synthesizer` may be `None` when only backend-rendered audio is played
    pub fn new(synthesizer: Option<Arc<SpeechSynthesizer>>, sink: Arc<dyn AudioSink>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            synthesizer,
            sink,
            events,
            current: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UtteranceEvent> {
        self.events.subscribe()
    }

    pub fn can_synthesize(&self) -> bool {
        self.synthesizer.is_some()
    }

    /// Start speaking, cancelling the active utterance first
    ///
    /// Must be called from within a tokio runtime.
    pub fn speak(&self, utterance: Utterance) -> UtteranceId {
        let id = UtteranceId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let mut current = self.current.lock();
        if let Some(previous) = current.take() {
            self.abort(previous);
        }

        debug!("Utterance {} queued ({} chars)", id, utterance.text.chars().count());
        let handle = tokio::spawn(run(
            id,
            utterance,
            self.synthesizer.clone(),
            self.sink.clone(),
            self.events.clone(),
            self.current.clone(),
        ));
        *current = Some(Active { id, handle });
        id
    }

    /// Stop the active utterance; returns its id if one was playing
    pub fn cancel(&self) -> Option<UtteranceId> {
        let previous = self.current.lock().take()?;
        let id = previous.id;
        self.abort(previous);
        Some(id)
    }

    pub fn current(&self) -> Option<UtteranceId> {
        self.current.lock().as_ref().map(|a| a.id)
    }

    pub fn is_speaking(&self) -> bool {
        self.current.lock().is_some()
    }

    fn abort(&self, active: Active) {
        active.handle.abort();
        debug!("Utterance {} cancelled", active.id);
        let _ = self.events.send(UtteranceEvent::Cancelled { id: active.id });
    }
}

impl Drop for SpeechQueue {
    fn drop(&mut self) {
        if let Some(active) = self.current.lock().take() {
            active.handle.abort();
        }
    }
}

/// Emit `Started` if `id` is still the active utterance
fn announce(slot: &Slot, events: &broadcast::Sender<UtteranceEvent>, id: UtteranceId, audio: Option<Bytes>) -> bool {
    let current = slot.lock();
    if current.as_ref().map(|a| a.id) != Some(id) {
        return false;
    }
    let _ = events.send(UtteranceEvent::Started { id, audio });
    true
}

/// Release the slot and emit the terminal event, unless already cancelled
fn finish(slot: &Slot, events: &broadcast::Sender<UtteranceEvent>, event: UtteranceEvent) {
    let mut current = slot.lock();
    if current.as_ref().map(|a| a.id) != Some(event.id()) {
        return;
    }
    *current = None;
    let _ = events.send(event);
}

async fn run(
    id: UtteranceId,
    utterance: Utterance,
    synthesizer: Option<Arc<SpeechSynthesizer>>,
    sink: Arc<dyn AudioSink>,
    events: broadcast::Sender<UtteranceEvent>,
    slot: Slot,
) {
    let mut started = false;

    if let Some(audio) = utterance.audio {
        if !announce(&slot, &events, id, Some(audio.clone())) {
            return;
        }
        started = true;
        match sink.play(&audio).await {
            Ok(()) => {
                finish(&slot, &events, UtteranceEvent::Ended { id });
                return;
            }
            Err(e) => warn!("Backend audio playback failed, synthesizing instead: {}", e),
        }
    }

    let result: Result<(), SpeechError> = async {
        let synthesizer = synthesizer
            .ok_or_else(|| SpeechError::Synthesizer("No speech synthesizer available".to_string()))?;
        let audio = synthesizer.speak(&utterance.text).await?;
        if !started && !announce(&slot, &events, id, Some(audio.clone())) {
            return Ok(());
        }
        sink.play(&audio).await
    }
    .await;

    let event = match result {
        Ok(()) => UtteranceEvent::Ended { id },
        Err(e) => {
            warn!("Utterance {} failed: {}", id, e);
            UtteranceEvent::Failed { id, error: e.to_string() }
        }
    };
    finish(&slot, &events, event);
}

//! Avatar animation state machine
//!
//! The animator is shared between the session and the speech follower task.
//! Speaking is owned either by one utterance (by id) or by a timed pulse;
//! a newer owner always supersedes the older one, and an owner can only end
//! its own speaking state.

use crate::config::AvatarConfig;
use crate::error::AvatarError;
use crate::lip_sync::LipSyncTrack;
use crate::state::{AvatarAnimation, AvatarState, MouthShape};
use parking_lot::RwLock;
use sima_spk::{UtteranceEvent, UtteranceId};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Speaker {
    Utterance(UtteranceId),
    Pulse(u64),
}

struct Inner {
    state: AvatarState,
    entrance_done: bool,
    speaker: Option<Speaker>,
    generation: u64,
}

/// Shared avatar state machine
#[derive(Clone)]
pub struct AvatarAnimator {
    config: Arc<AvatarConfig>,
    inner: Arc<RwLock<Inner>>,
    updates: broadcast::Sender<AvatarState>,
}

impl fmt::Debug for AvatarAnimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarAnimator")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

impl AvatarAnimator {
    pub fn new(config: AvatarConfig) -> Result<Self, AvatarError> {
        config.validate().map_err(AvatarError::Config)?;
        let (updates, _) = broadcast::channel(128);
        Ok(Self {
            config: Arc::new(config),
            inner: Arc::new(RwLock::new(Inner {
                state: AvatarState::entering(),
                entrance_done: false,
                speaker: None,
                generation: 0,
            })),
            updates,
        })
    }

    pub fn config(&self) -> &AvatarConfig {
        &self.config
    }

    pub fn state(&self) -> AvatarState {
        self.inner.read().state.clone()
    }

    pub fn animation(&self) -> AvatarAnimation {
        self.inner.read().state.current_animation
    }

    pub fn is_speaking(&self) -> bool {
        self.inner.read().state.is_speaking
    }

    /// State changes, one snapshot per change
    pub fn subscribe(&self) -> broadcast::Receiver<AvatarState> {
        self.updates.subscribe()
    }

    /// Apply `f` and publish the result if anything changed
    fn update<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self.inner.write();
        let before = inner.state.clone();
        let result = f(&mut *inner);
        let animation = inner.state.resolve(inner.entrance_done);
        inner.state.current_animation = animation;
        if inner.state != before {
            let _ = self.updates.send(inner.state.clone());
        }
        result
    }

    /// Utterance audio started playing
    pub fn utterance_started(&self, id: UtteranceId) {
        debug!("Avatar speaking for utterance {}", id);
        self.update(|inner| {
            inner.generation += 1;
            inner.speaker = Some(Speaker::Utterance(id));
            inner.state.is_speaking = true;
            inner.state.mouth_open = None;
        });
    }

    /// Utterance ended, failed or was cancelled
    ///
    /// Returns `false` when `id` no longer owns the speaking state.
    pub fn utterance_finished(&self, id: UtteranceId) -> bool {
        self.update(|inner| {
            if inner.speaker != Some(Speaker::Utterance(id)) {
                return false;
            }
            stop_speaking(inner);
            true
        })
    }

    /// Speak for a fixed time without audio
    pub fn speak_for(&self, duration: Duration) {
        let generation = self.update(|inner| {
            inner.generation += 1;
            inner.speaker = Some(Speaker::Pulse(inner.generation));
            inner.state.is_speaking = true;
            inner.state.mouth_open = None;
            inner.generation
        });

        let animator = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            animator.update(|inner| {
                if inner.speaker == Some(Speaker::Pulse(generation)) {
                    stop_speaking(inner);
                }
            });
        });
    }

    pub fn set_listening(&self, listening: bool) {
        self.update(|inner| inner.state.is_listening = listening);
    }

    pub fn set_thinking(&self, thinking: bool) {
        self.update(|inner| inner.state.is_thinking = thinking);
    }

    /// Mouth shape for utterance `id`; ignored once it stopped speaking
    pub fn set_mouth(&self, id: UtteranceId, shape: Option<MouthShape>) {
        self.update(|inner| {
            if inner.speaker == Some(Speaker::Utterance(id)) {
                inner.state.mouth_open = shape;
            }
        });
    }

    pub fn finish_entrance(&self) {
        self.update(|inner| inner.entrance_done = true);
    }

    /// Restart the entrance animation and finish it after the configured time
    pub fn play_entrance(&self) {
        self.update(|inner| inner.entrance_done = false);
        let animator = self.clone();
        let duration = self.config.entrance();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            animator.finish_entrance();
        });
    }

    /// Clear speaking, listening and thinking
    pub fn reset(&self) {
        self.update(|inner| {
            inner.generation += 1;
            stop_speaking(inner);
            inner.state.is_listening = false;
            inner.state.is_thinking = false;
        });
    }

    /// Follow speech queue events until the queue goes away
    ///
    /// An utterance that fails before it started still gets a speaking pulse.
    pub fn follow(&self, mut events: broadcast::Receiver<UtteranceEvent>) -> JoinHandle<()> {
        let animator = self.clone();
        tokio::spawn(async move {
            let mut lip_sync: Option<(UtteranceId, JoinHandle<()>)> = None;
            let mut last_started: Option<UtteranceId> = None;
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("Avatar missed {} speech events", missed);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                let superseded = match &lip_sync {
                    Some((id, _)) => *id == event.id() || !event.is_terminal(),
                    None => false,
                };
                if superseded {
                    if let Some((_, handle)) = lip_sync.take() {
                        handle.abort();
                    }
                }
                match event {
                    UtteranceEvent::Started { id, audio } => {
                        last_started = Some(id);
                        animator.utterance_started(id);
                        if animator.config.lip_sync {
                            lip_sync = audio
                                .and_then(|a| LipSyncTrack::from_wav(&a, animator.config.window_size).ok())
                                .filter(|track| !track.is_empty())
                                .map(|track| (id, animator.play_track(id, track)));
                        }
                    }
                    UtteranceEvent::Failed { id, error } if last_started != Some(id) => {
                        debug!("Utterance {} never played ({}), pulsing instead", id, error);
                        animator.speak_for(animator.config.fallback_speaking());
                    }
                    other => {
                        animator.utterance_finished(other.id());
                    }
                }
            }
            if let Some((_, handle)) = lip_sync {
                handle.abort();
            }
        })
    }

    fn play_track(&self, id: UtteranceId, track: LipSyncTrack) -> JoinHandle<()> {
        let animator = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(track.frame_duration().max(Duration::from_millis(1)));
            for shape in track.frames() {
                ticker.tick().await;
                animator.set_mouth(id, Some(*shape));
            }
            ticker.tick().await;
            animator.set_mouth(id, Some(MouthShape::Closed));
        })
    }
}

fn stop_speaking(inner: &mut Inner) {
    inner.speaker = None;
    inner.state.is_speaking = false;
    inner.state.mouth_open = None;
}

//! Session controller
//!
//! One conversation with one persona at a time. Sending goes over the socket
//! channel when it is connected and over HTTP otherwise; every accepted
//! message produces exactly one persona line in the history. Switching
//! persona starts a new epoch, and replies from an older epoch are dropped.

use crate::error::{SessionError, TransportError};
use crate::transport::http::HttpTransport;
use crate::transport::socket::SocketTransport;
use crate::transport::{ChatTransport, Route, TransportStatus};
use parking_lot::RwLock;
use sima_core::{ChatMessage, ChatReply, ChatRequest, ClientConfig, HistoricalEvent, Persona, PersonaCatalog};
use sima_me::{AvatarAnimator, AvatarConfig, AvatarState};
use sima_spk::{AudioSink, CommandSink, SilentSink, SpeechConfig, SpeechQueue, SpeechSynthesizer, Utterance};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Shown in place of a reply when the backend could not answer
pub const APOLOGY: &str = "Üzgünüm, şu anda yanıt veremiyorum. Lütfen tekrar deneyin.";

/// How `SessionController::from_config` wires things up
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Try the socket channel
    pub use_socket: bool,
    /// No audio output at all; the avatar still animates
    pub mute: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            use_socket: true,
            mute: false,
        }
    }
}

#[derive(Default)]
struct SessionState {
    persona: Option<Persona>,
    messages: Vec<ChatMessage>,
    selected_event: Option<String>,
    loading: bool,
    epoch: u64,
    last_route: Option<Route>,
}

/// Conversation state plus the speech and avatar it drives
pub struct SessionController {
    catalog: Arc<PersonaCatalog>,
    http: Arc<dyn ChatTransport>,
    socket: Option<Arc<dyn ChatTransport>>,
    speech: Option<Arc<SpeechQueue>>,
    avatar: AvatarAnimator,
    state: RwLock<SessionState>,
    follower: Option<JoinHandle<()>>,
}

/// Clears the loading flag when a send finishes or is dropped
struct LoadingGuard<'a> {
    state: &'a RwLock<SessionState>,
    avatar: &'a AvatarAnimator,
    epoch: u64,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.write();
        if state.epoch == self.epoch {
            state.loading = false;
            self.avatar.set_thinking(false);
        }
    }
}

impl SessionController {
    /// Must be called from within a tokio runtime when `speech` is given
    pub fn new(
        catalog: Arc<PersonaCatalog>,
        http: Arc<dyn ChatTransport>,
        socket: Option<Arc<dyn ChatTransport>>,
        speech: Option<Arc<SpeechQueue>>,
        avatar: AvatarAnimator,
    ) -> Self {
        let follower = speech.as_ref().map(|queue| avatar.follow(queue.subscribe()));
        Self {
            catalog,
            http,
            socket,
            speech,
            avatar,
            state: RwLock::new(SessionState::default()),
            follower,
        }
    }

    /// Build transports, speech and avatar from client configuration
    pub async fn from_config(config: &ClientConfig, options: SessionOptions) -> Result<Self, SessionError> {
        config.validate().map_err(SessionError::InvalidRequest)?;

        let http: Arc<dyn ChatTransport> = Arc::new(HttpTransport::new(
            &config.api_url,
            Duration::from_secs(config.request_timeout_secs),
        )?);

        let socket: Option<Arc<dyn ChatTransport>> = if config.socket_enabled && options.use_socket {
            match SocketTransport::connect(
                &config.socket_url,
                Duration::from_secs(config.request_timeout_secs.min(10)),
                Duration::from_secs(config.reply_timeout_secs),
            )
            .await
            {
                Ok(socket) => Some(Arc::new(socket)),
                Err(e) => {
                    warn!("Socket unavailable, using HTTP only: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let avatar = AvatarAnimator::new(AvatarConfig::from_settings(&config.avatar))?;
        let speech = if config.speech.enabled {
            Some(Arc::new(build_speech(config, options.mute)))
        } else {
            None
        };

        Ok(Self::new(
            Arc::new(PersonaCatalog::builtin()),
            http,
            socket,
            speech,
            avatar,
        ))
    }

    pub fn catalog(&self) -> &PersonaCatalog {
        &self.catalog
    }

    pub fn avatar(&self) -> &AvatarAnimator {
        &self.avatar
    }

    pub fn speech(&self) -> Option<&Arc<SpeechQueue>> {
        self.speech.as_ref()
    }

    /// Switch persona, clearing everything tied to the previous one
    pub fn select_persona(&self, id: &str) -> Result<Persona, SessionError> {
        let persona = self
            .catalog
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownPersona(id.to_string()))?;

        if let Some(queue) = &self.speech {
            queue.cancel();
        }
        self.avatar.reset();
        {
            let mut state = self.state.write();
            state.persona = Some(persona.clone());
            state.messages.clear();
            state.selected_event = None;
            state.loading = false;
            state.epoch += 1;
        }
        self.avatar.play_entrance();
        info!("Persona selected: {}", persona.name);
        Ok(persona)
    }

    pub fn select_event(&self, event_id: &str) -> Result<HistoricalEvent, SessionError> {
        let mut state = self.state.write();
        let persona = state.persona.as_ref().ok_or(SessionError::NoPersona)?;
        let event = persona
            .event(event_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownEvent(event_id.to_string()))?;
        state.selected_event = Some(event.id.clone());
        Ok(event)
    }

    pub fn clear_event(&self) {
        self.state.write().selected_event = None;
    }

    pub fn selected_event(&self) -> Option<HistoricalEvent> {
        let state = self.state.read();
        let id = state.selected_event.as_deref()?;
        state.persona.as_ref()?.event(id).cloned()
    }

    pub fn persona(&self) -> Option<Persona> {
        self.state.read().persona.clone()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state.read().messages.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn avatar_state(&self) -> AvatarState {
        self.avatar.state()
    }

    pub fn set_listening(&self, listening: bool) {
        self.avatar.set_listening(listening);
    }

    pub fn transport_status(&self) -> TransportStatus {
        let socket_connected = self.socket.as_ref().map(|s| s.is_connected());
        TransportStatus {
            socket_connected,
            preferred: if socket_connected == Some(true) { Route::Socket } else { Route::Http },
            last_route: self.state.read().last_route,
        }
    }

    /// Send `text` to the selected persona and render its reply
    pub async fn send_message(&self, text: &str) -> Result<ChatMessage, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        let (request, persona_name, epoch) = {
            let mut state = self.state.write();
            let persona = state.persona.as_ref().ok_or(SessionError::NoPersona)?;
            let request = ChatRequest::new(persona.id.as_str(), text);
            request
                .validate()
                .map_err(|e| SessionError::InvalidRequest(e.to_string()))?;
            let persona_name = persona.name.clone();
            if state.loading {
                return Err(SessionError::Busy);
            }
            state.loading = true;
            state.messages.push(ChatMessage::user(text));
            (request, persona_name, state.epoch)
        };
        let _loading = LoadingGuard {
            state: &self.state,
            avatar: &self.avatar,
            epoch,
        };
        self.avatar.set_thinking(true);

        let (result, route) = self.deliver(&request).await;

        {
            let mut state = self.state.write();
            if state.epoch != epoch {
                debug!("Dropping reply for a previous persona");
                return Err(SessionError::Superseded);
            }
            state.last_route = Some(route);
        }

        match result {
            Ok(reply) => {
                let message = ChatMessage::persona(&reply);
                self.state.write().messages.push(message.clone());
                self.handle_reply(&reply, route);
                Ok(message)
            }
            Err(e) => {
                warn!("Message failed over {:?}: {}", route, e);
                let apology = ChatReply::new(APOLOGY, persona_name);
                self.state.write().messages.push(ChatMessage::persona(&apology));
                Err(e.into())
            }
        }
    }

    /// Socket first when connected; HTTP when there is no socket or it never took the message
    async fn deliver(&self, request: &ChatRequest) -> (Result<ChatReply, TransportError>, Route) {
        if let Some(socket) = self.socket.as_ref().filter(|s| s.is_connected()) {
            match socket.send(request).await {
                Err(e) if e.is_undelivered() => {
                    warn!("Socket did not take the message ({}), falling back to HTTP", e);
                }
                result => return (result, Route::Socket),
            }
        }
        (self.http.send(request).await, Route::Http)
    }

    /// Speak a reply, or animate for a fixed time when it cannot be spoken
    pub fn handle_reply(&self, reply: &ChatReply, route: Route) {
        let audio = reply.decode_audio();
        match &self.speech {
            Some(queue) if audio.is_some() || queue.can_synthesize() => {
                let id = queue.speak(Utterance::text(reply.response.clone()).with_audio(audio));
                debug!("Reply queued as utterance {}", id);
            }
            _ => {
                let config = self.avatar.config();
                let pulse = match route {
                    Route::Socket => config.fallback_speaking(),
                    Route::Http => config.http_speaking(),
                };
                self.avatar.speak_for(pulse);
            }
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(follower) = self.follower.take() {
            follower.abort();
        }
    }
}

fn build_speech(config: &ClientConfig, mute: bool) -> SpeechQueue {
    let fallback = Duration::from_millis(config.avatar.fallback_speaking_ms);
    if mute {
        return SpeechQueue::new(None, Arc::new(SilentSink::new(fallback)));
    }

    let speech_config = SpeechConfig::from_settings(&config.speech);
    let synthesizer = match SpeechSynthesizer::new(speech_config.clone()) {
        Ok(synth) => Some(Arc::new(synth)),
        Err(e) => {
            debug!("Native speech unavailable ({}), trying the backend", e);
            SpeechSynthesizer::new(speech_config.with_backend(&config.api_url, config.request_timeout_secs))
                .map(Arc::new)
                .map_err(|e| warn!("No speech synthesizer: {}", e))
                .ok()
        }
    };

    let sink: Arc<dyn AudioSink> = match CommandSink::detect() {
        Some(sink) => Arc::new(sink),
        None => {
            info!("No audio player found, speech will be silent");
            Arc::new(SilentSink::new(fallback))
        }
    };
    SpeechQueue::new(synthesizer, sink)
}

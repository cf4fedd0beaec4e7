//! sima-server: Development backend for Tarih-i Sima
//!
//! Serves the HTTP API (`/`, `/api/figures`, `/api/chat`, `/api/tts`) and the
//! `/ws` socket channel on one listener. Replies come from a
//! [`ReplyGenerator`]; audio is rendered with `sima-spk` when available.

pub mod config;
pub mod error;
pub mod reply;
pub mod routes;
pub mod ws;

pub use config::ServerConfig;
pub use error::{GenerationError, ServerError};
pub use reply::{OpenAiGenerator, ReplyGenerator, ScriptedGenerator};

use axum::routing::{get, post};
use axum::Router;
use sima_core::{ChatReply, ChatRequest, PersonaCatalog};
use sima_spk::{SpeechConfig, SpeechSynthesizer, TtsEngine};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<PersonaCatalog>,
    pub generator: Arc<dyn ReplyGenerator>,
    pub tts: Option<Arc<SpeechSynthesizer>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        generator: Arc<dyn ReplyGenerator>,
        tts: Option<Arc<SpeechSynthesizer>>,
    ) -> Self {
        Self {
            catalog: Arc::new(PersonaCatalog::builtin()),
            generator,
            tts,
            config: Arc::new(config),
        }
    }

    /// OpenAI when a key is configured, scripted answers otherwise
    pub fn from_config(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate().map_err(ServerError::Config)?;

        let generator: Arc<dyn ReplyGenerator> = if config.openai_api_key.is_some() {
            Arc::new(OpenAiGenerator::new(&config)?)
        } else {
            info!("OPENAI_API_KEY not set, using scripted replies");
            Arc::new(ScriptedGenerator)
        };

        let tts = if config.enable_tts {
            let speech = SpeechConfig {
                enabled: true,
                engine: TtsEngine::Native,
                ..SpeechConfig::default()
            };
            match SpeechSynthesizer::new(speech) {
                Ok(synth) => Some(Arc::new(synth)),
                Err(e) => {
                    warn!("TTS disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self::new(config, generator, tts))
    }

    /// Validate `request` and produce the persona's reply
    ///
    /// Audio is attached only when `with_audio` is set and a synthesizer exists;
    /// synthesis failures leave it `None`.
    pub async fn answer(&self, request: &ChatRequest, with_audio: bool) -> Result<ChatReply, ServerError> {
        request.validate()?;
        let persona = self
            .catalog
            .get(&request.figure_id)
            .ok_or_else(|| ServerError::BadRequest("Geçersiz figür ID'si".to_string()))?;

        let response = self.generator.generate(persona, &request.message).await?;

        let audio = match (&self.tts, with_audio) {
            (Some(tts), true) => match tts.speak(&response).await {
                Ok(audio) => Some(sima_core::protocol::encode_base64_audio(&audio)),
                Err(e) => {
                    warn!("Reply audio failed for {}: {}", persona.id, e);
                    None
                }
            },
            _ => None,
        };

        let mut reply = ChatReply::new(response, persona.name.clone());
        reply.audio = audio;
        reply.model = Some(self.generator.model().to_string());
        reply.request_id = request.request_id;
        Ok(reply)
    }
}

/// All routes, with permissive CORS
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::home))
        .route("/api/figures", get(routes::figures))
        .route("/api/chat", post(routes::chat))
        .route("/api/tts", post(routes::tts))
        .route("/ws", get(ws::socket_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until the listener fails
pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), ServerError> {
    let addr = listener.local_addr()?;
    info!("Tarih-i Sima server listening on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

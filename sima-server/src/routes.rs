//! HTTP handlers

use crate::error::ServerError;
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use sima_core::{ChatReply, ChatRequest, Persona, ServiceInfo, TtsReply};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Missing fields are reported as a 400 with the usual message, not a serde rejection
#[derive(Debug, Deserialize)]
pub struct ChatBody {
    figure_id: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TtsBody {
    text: Option<String>,
}

pub async fn home(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "Tarih-i Sima API'ye hoş geldiniz!".to_string(),
        version: "1.0.0".to_string(),
        available_figures: state.catalog.ids().iter().map(|id| id.to_string()).collect(),
    })
}

pub async fn figures(State(state): State<AppState>) -> Json<BTreeMap<String, Persona>> {
    Json(
        state
            .catalog
            .iter()
            .map(|p| (p.id.to_string(), p.clone()))
            .collect(),
    )
}

pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<ChatReply>, ServerError> {
    let missing = || ServerError::BadRequest("figure_id ve message gerekli".to_string());
    let Json(body) = body.map_err(|e| {
        debug!("Rejected chat body: {}", e);
        missing()
    })?;
    let (figure_id, message) = match (body.figure_id, body.message) {
        (Some(figure_id), Some(message)) => (figure_id, message),
        _ => return Err(missing()),
    };

    let request = ChatRequest::new(figure_id, message);
    let reply = state.answer(&request, true).await?;
    info!("Answered {} over HTTP", request.figure_id);
    Ok(Json(reply))
}

pub async fn tts(
    State(state): State<AppState>,
    body: Result<Json<TtsBody>, JsonRejection>,
) -> Result<Json<TtsReply>, ServerError> {
    let text = body
        .ok()
        .and_then(|Json(body)| body.text)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ServerError::BadRequest("text gerekli".to_string()))?;

    let tts = state
        .tts
        .as_ref()
        .ok_or_else(|| ServerError::Unavailable("TTS kullanılamıyor".to_string()))?;
    let audio = tts.speak(&text).await?;

    Ok(Json(TtsReply {
        audio: Some(sima_core::protocol::encode_base64_audio(&audio)),
        timestamp: sima_core::protocol::local_timestamp(),
    }))
}

//! Tests for the backend `/api/tts` engine against an in-process server

use axum::{routing::post, Json, Router};
use sima_core::{protocol::encode_base64_audio, TtsReply, TtsRequest};
use sima_spk::config::{ApiTtsConfig, VoiceConfig};
use sima_spk::engines::backend::BackendTtsEngine;
use sima_spk::engines::TtsEngine;
use sima_spk::error::SpeechError;
use tokio::net::TcpListener;

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn fast_retry(endpoint: String) -> ApiTtsConfig {
    let mut config = ApiTtsConfig::for_backend(endpoint, 5);
    config.retry_config.max_retries = 1;
    config.retry_config.initial_delay_ms = 10;
    config.retry_config.max_delay_ms = 20;
    config
}

#[tokio::test]
async fn test_backend_engine_decodes_audio() {
    let router = Router::new().route(
        "/api/tts",
        post(|Json(req): Json<TtsRequest>| async move {
            Json(TtsReply {
                audio: Some(encode_base64_audio(req.text.as_bytes())),
                timestamp: "now".to_string(),
            })
        }),
    );
    let endpoint = serve(router).await;
    let engine = BackendTtsEngine::new(&fast_retry(endpoint)).unwrap();

    let audio = engine.synthesize("Merhaba", &VoiceConfig::default()).await.unwrap();
    assert_eq!(audio.as_ref(), "Merhaba".as_bytes());
    assert_eq!(engine.name(), "backend");
}

#[tokio::test]
async fn test_backend_engine_reports_missing_audio() {
    let router = Router::new().route(
        "/api/tts",
        post(|| async {
            Json(TtsReply {
                audio: None,
                timestamp: "now".to_string(),
            })
        }),
    );
    let endpoint = serve(router).await;
    let engine = BackendTtsEngine::new(&fast_retry(endpoint)).unwrap();

    let result = engine.synthesize("Merhaba", &VoiceConfig::default()).await;
    assert!(matches!(result, Err(SpeechError::Api(_))));
}

#[tokio::test]
async fn test_backend_engine_unreachable() {
    let engine = BackendTtsEngine::new(&fast_retry("http://127.0.0.1:9".to_string())).unwrap();
    let result = engine.synthesize("Merhaba", &VoiceConfig::default()).await;
    assert!(matches!(result, Err(SpeechError::Api(_))));
}

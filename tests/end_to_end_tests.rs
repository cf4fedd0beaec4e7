// End-to-end tests
// Session controller against an in-process development server

use bytes::Bytes;
use sima_chat::{Route, SessionController, SessionError, SessionOptions};
use sima_core::ClientConfig;
use sima_server::{AppState, ScriptedGenerator, ServerConfig};
use sima_spk::config::{SpeechConfig, TtsEngine};
use sima_spk::engines::custom::CustomTtsEngine;
use sima_spk::SpeechSynthesizer;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::{sleep, timeout};

async fn start_server(tts: Option<Arc<SpeechSynthesizer>>) -> String {
    let state = AppState::new(ServerConfig::default(), Arc::new(ScriptedGenerator), tts);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(sima_server::serve(listener, state));
    format!("127.0.0.1:{}", port)
}

fn echo_tts() -> Arc<SpeechSynthesizer> {
    let config = SpeechConfig {
        enabled: true,
        engine: TtsEngine::Custom("echo".to_string()),
        ..SpeechConfig::default()
    };
    let engine = Arc::new(CustomTtsEngine::new("echo", |text, _| Ok(Bytes::from(text.as_bytes().to_vec()))));
    Arc::new(SpeechSynthesizer::with_engine(config, engine).unwrap())
}

fn client_config(addr: &str, socket: bool) -> ClientConfig {
    let mut config = ClientConfig {
        api_url: format!("http://{}", addr),
        socket_url: format!("ws://{}/ws", addr),
        socket_enabled: socket,
        request_timeout_secs: 5,
        reply_timeout_secs: 5,
        ..ClientConfig::default()
    };
    config.speech.enabled = false;
    config.avatar.fallback_speaking_ms = 100;
    config.avatar.http_speaking_ms = 150;
    config.avatar.entrance_ms = 10;
    config
}

async fn wait_until(f: impl Fn() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !f() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_chat_over_socket() {
    let addr = start_server(None).await;
    let session = SessionController::from_config(&client_config(&addr, true), SessionOptions::default())
        .await
        .unwrap();
    assert_eq!(session.transport_status().socket_connected, Some(true));

    session.select_persona("napoleon").unwrap();
    let reply = session.send_message("Austerlitz Savaşı nasıl kazanıldı?").await.unwrap();

    assert_eq!(reply.figure_name.as_deref(), Some("Napolyon Bonaparte"));
    assert!(reply.text.contains("1805"));
    assert_eq!(session.transport_status().last_route, Some(Route::Socket));
    assert_eq!(session.messages().len(), 2);
}

#[tokio::test]
async fn test_chat_over_http_without_socket() {
    let addr = start_server(None).await;
    let session = SessionController::from_config(&client_config(&addr, false), SessionOptions::default())
        .await
        .unwrap();
    assert_eq!(session.transport_status().socket_connected, None);

    session.select_persona("ataturk").unwrap();
    session.send_message("Samsun'a Çıkış").await.unwrap();

    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[1].text.contains("1919"));
    assert_eq!(session.transport_status().last_route, Some(Route::Http));
}

#[tokio::test]
async fn test_unreachable_socket_falls_back_to_http() {
    let addr = start_server(None).await;
    let mut config = client_config(&addr, true);
    config.socket_url = "ws://127.0.0.1:9/ws".to_string();

    let session = SessionController::from_config(&config, SessionOptions::default()).await.unwrap();
    session.select_persona("fatih_sultan_mehmet").unwrap();
    session.send_message("Merhaba").await.unwrap();

    assert_eq!(session.transport_status().last_route, Some(Route::Http));
    assert_eq!(session.messages().iter().filter(|m| !m.is_user).count(), 1);
}

#[tokio::test]
async fn test_socket_disabled_by_option() {
    let addr = start_server(None).await;
    let options = SessionOptions {
        use_socket: false,
        mute: true,
    };
    let session = SessionController::from_config(&client_config(&addr, true), options).await.unwrap();
    assert_eq!(session.transport_status().socket_connected, None);
}

#[tokio::test]
async fn test_server_down_renders_one_apology() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let session = SessionController::from_config(&client_config(&addr, true), SessionOptions::default())
        .await
        .unwrap();
    session.select_persona("ataturk").unwrap();

    let result = session.send_message("Merhaba").await;
    assert!(matches!(result, Err(SessionError::Transport(_))));
    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].text, sima_chat::session::APOLOGY);
    assert_eq!(messages[1].figure_name.as_deref(), Some("Mustafa Kemal Atatürk"));
    assert!(!session.is_loading());
}

#[tokio::test]
async fn test_unknown_event_and_persona_from_session() {
    let addr = start_server(None).await;
    let session = SessionController::from_config(&client_config(&addr, false), SessionOptions::default())
        .await
        .unwrap();
    assert!(matches!(session.select_persona("cleopatra"), Err(SessionError::UnknownPersona(_))));
    assert!(matches!(session.select_event("waterloo"), Err(SessionError::NoPersona)));
}

// ============================================================================
// Persona switching
// ============================================================================

#[tokio::test]
async fn test_persona_switch_resets_conversation() {
    let addr = start_server(None).await;
    let session = SessionController::from_config(&client_config(&addr, true), SessionOptions::default())
        .await
        .unwrap();

    session.select_persona("napoleon").unwrap();
    session.select_event("waterloo").unwrap();
    session.send_message("Waterloo Savaşı").await.unwrap();
    assert!(session.avatar_state().is_speaking);

    session.select_persona("ataturk").unwrap();
    assert!(session.messages().is_empty());
    assert!(session.selected_event().is_none());
    assert!(!session.avatar_state().is_speaking);

    let reply = session.send_message("Cumhuriyetin İlanı").await.unwrap();
    assert_eq!(reply.figure_name.as_deref(), Some("Mustafa Kemal Atatürk"));
}

// ============================================================================
// Speech and avatar
// ============================================================================

#[tokio::test]
async fn test_socket_reply_pulses_avatar() {
    let addr = start_server(None).await;
    let session = SessionController::from_config(&client_config(&addr, true), SessionOptions::default())
        .await
        .unwrap();
    session.select_persona("napoleon").unwrap();

    session.send_message("Merhaba").await.unwrap();
    assert!(session.avatar_state().is_speaking);
    wait_until(|| !session.avatar_state().is_speaking).await;
}

#[tokio::test]
async fn test_http_reply_audio_is_played() {
    let addr = start_server(Some(echo_tts())).await;
    let mut config = client_config(&addr, false);
    config.speech.enabled = true;
    let options = SessionOptions {
        use_socket: false,
        mute: true,
    };
    let session = SessionController::from_config(&config, options).await.unwrap();
    session.select_persona("ataturk").unwrap();

    let reply = session.send_message("Harf Devrimi").await.unwrap();
    assert!(reply.audio.is_some());

    let queue = session.speech().unwrap().clone();
    wait_until(|| session.avatar_state().is_speaking).await;
    wait_until(|| !session.avatar_state().is_speaking).await;
    wait_until(|| !queue.is_speaking()).await;
}

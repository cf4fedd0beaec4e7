//! HTTP routes and socket channel against an in-process server

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use sima_core::{ChatReply, ChatRequest, ErrorBody, ServiceInfo, SocketEvent, TtsReply};
use sima_server::{AppState, ScriptedGenerator, ServerConfig};
use sima_spk::config::{SpeechConfig, TtsEngine};
use sima_spk::engines::custom::CustomTtsEngine;
use sima_spk::SpeechSynthesizer;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

fn echo_tts() -> Arc<SpeechSynthesizer> {
    let config = SpeechConfig {
        enabled: true,
        engine: TtsEngine::Custom("echo".to_string()),
        ..SpeechConfig::default()
    };
    let engine = Arc::new(CustomTtsEngine::new("echo", |text, _| Ok(Bytes::from(text.as_bytes().to_vec()))));
    Arc::new(SpeechSynthesizer::with_engine(config, engine).unwrap())
}

async fn start(tts: Option<Arc<SpeechSynthesizer>>) -> String {
    let state = AppState::new(ServerConfig::default(), Arc::new(ScriptedGenerator), tts);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(sima_server::serve(listener, state));
    format!("127.0.0.1:{}", addr.port())
}

#[tokio::test]
async fn test_home_lists_figures() {
    let addr = start(None).await;
    let info: ServiceInfo = reqwest::get(format!("http://{}/", addr)).await.unwrap().json().await.unwrap();
    assert_eq!(info.message, "Tarih-i Sima API'ye hoş geldiniz!");
    assert_eq!(info.version, "1.0.0");
    assert_eq!(info.available_figures.len(), 3);
}

#[tokio::test]
async fn test_figures_keyed_by_id() {
    let addr = start(None).await;
    let figures: BTreeMap<String, serde_json::Value> = reqwest::get(format!("http://{}/api/figures", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(figures["ataturk"]["name"], "Mustafa Kemal Atatürk");
    assert!(figures.contains_key("fatih_sultan_mehmet"));
}

#[tokio::test]
async fn test_chat_with_audio() {
    let addr = start(Some(echo_tts())).await;
    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{}/api/chat", addr))
        .json(&ChatRequest::new("napoleon", "Waterloo Savaşı?"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let reply: ChatReply = response.json().await.unwrap();
    assert_eq!(reply.figure_name, "Napolyon Bonaparte");
    assert_eq!(reply.model.as_deref(), Some("scripted"));
    assert!(!reply.timestamp.is_empty());
    let audio = reply.decode_audio().unwrap();
    assert_eq!(&audio[..], reply.response.as_bytes());
}

#[tokio::test]
async fn test_chat_rejects_bad_requests() {
    let addr = start(None).await;
    let client = reqwest::Client::new();
    let url = format!("http://{}/api/chat", addr);

    let missing = client.post(&url).json(&serde_json::json!({ "figure_id": "ataturk" })).send().await.unwrap();
    assert_eq!(missing.status(), 400);
    let body: ErrorBody = missing.json().await.unwrap();
    assert_eq!(body.error, "figure_id ve message gerekli");

    let unknown = client.post(&url).json(&ChatRequest::new("cleopatra", "Merhaba")).send().await.unwrap();
    assert_eq!(unknown.status(), 400);
    let body: ErrorBody = unknown.json().await.unwrap();
    assert_eq!(body.error, "Geçersiz figür ID'si");

    let garbage = client
        .post(&url)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status(), 400);
}

#[tokio::test]
async fn test_chat_without_tts_has_no_audio() {
    let addr = start(None).await;
    let reply: ChatReply = reqwest::Client::new()
        .post(format!("http://{}/api/chat", addr))
        .json(&ChatRequest::new("ataturk", "Merhaba"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(reply.audio.is_none());
    assert!(reply.response.starts_with("Ben Mustafa Kemal Atatürk."));
}

#[tokio::test]
async fn test_tts_route() {
    let addr = start(Some(echo_tts())).await;
    let client = reqwest::Client::new();
    let url = format!("http://{}/api/tts", addr);

    let reply: TtsReply = client
        .post(&url)
        .json(&serde_json::json!({ "text": "Merhaba" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(&reply.decode_audio().unwrap()[..], b"Merhaba");

    let empty = client.post(&url).json(&serde_json::json!({})).send().await.unwrap();
    assert_eq!(empty.status(), 400);
}

#[tokio::test]
async fn test_tts_unavailable() {
    let addr = start(None).await;
    let response = reqwest::Client::new()
        .post(format!("http://{}/api/tts", addr))
        .json(&serde_json::json!({ "text": "Merhaba" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
}

async fn next_event<S>(stream: &mut S) -> SocketEvent
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if let Message::Text(text) = frame {
            return SocketEvent::from_json(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn test_socket_channel() {
    let addr = start(Some(echo_tts())).await;
    let (stream, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    let (mut tx, mut rx) = stream.split();

    match next_event(&mut rx).await {
        SocketEvent::Connected { message, model } => {
            assert_eq!(message, "Sunucuya başarıyla bağlandınız");
            assert_eq!(model.as_deref(), Some("scripted"));
        }
        other => panic!("unexpected greeting: {:?}", other),
    }

    let request = SocketEvent::ChatMessage(ChatRequest::new("fatih_sultan_mehmet", "İstanbul Fethi").with_request_id(1));
    tx.send(Message::Text(request.to_json().unwrap())).await.unwrap();
    match next_event(&mut rx).await {
        SocketEvent::AiResponse(reply) => {
            assert_eq!(reply.figure_name, "Fatih Sultan Mehmet");
            assert!(reply.response.contains("1453"));
            assert!(reply.audio.is_none());
            assert_eq!(reply.request_id, Some(1));
        }
        other => panic!("unexpected reply: {:?}", other),
    }

    let request = SocketEvent::ChatMessage(ChatRequest::new("cleopatra", "Merhaba").with_request_id(2));
    tx.send(Message::Text(request.to_json().unwrap())).await.unwrap();
    assert_eq!(
        next_event(&mut rx).await,
        SocketEvent::Error {
            message: "Geçersiz figür ID'si".to_string(),
            request_id: Some(2),
        }
    );

    tx.send(Message::Text("nonsense".to_string())).await.unwrap();
    assert!(matches!(next_event(&mut rx).await, SocketEvent::Error { .. }));
}

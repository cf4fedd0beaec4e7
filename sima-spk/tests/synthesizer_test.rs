//! Tests for SpeechSynthesizer with custom engines

use bytes::Bytes;
use sima_spk::config::{SpeechConfig, TtsEngine};
use sima_spk::engines::custom::CustomTtsEngine;
use sima_spk::error::SpeechError;
use sima_spk::SpeechSynthesizer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn enabled_config() -> SpeechConfig {
    SpeechConfig {
        enabled: true,
        engine: TtsEngine::Custom("counting".to_string()),
        ..SpeechConfig::default()
    }
}

fn counting_engine(calls: Arc<AtomicUsize>) -> Arc<CustomTtsEngine> {
    Arc::new(CustomTtsEngine::new("counting", move |text, _voice| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Bytes::from(text.as_bytes().to_vec()))
    }))
}

#[tokio::test]
async fn test_cache_serves_repeated_text() {
    let calls = Arc::new(AtomicUsize::new(0));
    let synth = SpeechSynthesizer::with_engine(enabled_config(), counting_engine(calls.clone())).unwrap();

    let first = synth.speak("Merhaba").await.unwrap();
    let second = synth.speak("Merhaba").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(synth.cache_len(), 1);

    synth.speak("Başka bir cümle").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cache_disabled_calls_engine_each_time() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut config = enabled_config();
    config.enable_cache = false;
    let synth = SpeechSynthesizer::with_engine(config, counting_engine(calls.clone())).unwrap();

    synth.speak("Merhaba").await.unwrap();
    synth.speak("Merhaba").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(synth.cache_len(), 0);
}

#[tokio::test]
async fn test_empty_text_rejected() {
    let calls = Arc::new(AtomicUsize::new(0));
    let synth = SpeechSynthesizer::with_engine(enabled_config(), counting_engine(calls.clone())).unwrap();

    assert!(matches!(synth.speak("   ").await, Err(SpeechError::Synthesizer(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_engine_error_propagates() {
    let engine = Arc::new(CustomTtsEngine::new("broken", |_, _| {
        Err(SpeechError::Engine("no voice".to_string()))
    }));
    let synth = SpeechSynthesizer::with_engine(enabled_config(), engine).unwrap();
    let result = tokio_test::block_on(synth.speak("Merhaba"));
    assert!(matches!(result, Err(SpeechError::Engine(_))));
    assert_eq!(synth.cache_len(), 0);
}

#[test]
fn test_disabled_config_rejected() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = SpeechConfig {
        enabled: false,
        ..enabled_config()
    };
    assert!(matches!(
        SpeechSynthesizer::with_engine(config, counting_engine(calls)),
        Err(SpeechError::Config(_))
    ));
}

#[test]
fn test_custom_engine_kind_needs_explicit_engine() {
    assert!(matches!(
        SpeechSynthesizer::new(enabled_config()),
        Err(SpeechError::Engine(_))
    ));
}

//! Tests for the single-active-utterance queue

use async_trait::async_trait;
use bytes::Bytes;
use sima_spk::config::{SpeechConfig, TtsEngine};
use sima_spk::engines::custom::CustomTtsEngine;
use sima_spk::error::SpeechError;
use sima_spk::{AudioSink, SpeechQueue, SpeechSynthesizer, Utterance, UtteranceEvent, UtteranceId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;

/// Sink that "plays" for a fixed time, failing on audio equal to `b"bad"`
struct TimedSink(Duration);

#[async_trait]
impl AudioSink for TimedSink {
    async fn play(&self, audio: &Bytes) -> Result<(), SpeechError> {
        if audio.as_ref() == b"bad" {
            return Err(SpeechError::Playback("unplayable".to_string()));
        }
        tokio::time::sleep(self.0).await;
        Ok(())
    }

    fn name(&self) -> &str {
        "timed"
    }
}

fn synthesizer() -> Arc<SpeechSynthesizer> {
    let config = SpeechConfig {
        enabled: true,
        engine: TtsEngine::Custom("echo".to_string()),
        ..SpeechConfig::default()
    };
    let engine = Arc::new(CustomTtsEngine::new("echo", |text, _| {
        Ok(Bytes::from(text.as_bytes().to_vec()))
    }));
    Arc::new(SpeechSynthesizer::with_engine(config, engine).unwrap())
}

async fn next(rx: &mut broadcast::Receiver<UtteranceEvent>) -> UtteranceEvent {
    timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap()
}

#[tokio::test]
async fn test_utterance_reports_start_then_end() {
    let queue = SpeechQueue::new(Some(synthesizer()), Arc::new(TimedSink(Duration::from_millis(20))));
    let mut rx = queue.subscribe();

    let id = queue.speak(Utterance::text("Merhaba"));
    assert_eq!(queue.current(), Some(id));

    match next(&mut rx).await {
        UtteranceEvent::Started { id: started, audio } => {
            assert_eq!(started, id);
            assert_eq!(audio.unwrap().as_ref(), b"Merhaba");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(next(&mut rx).await, UtteranceEvent::Ended { id });
    assert!(!queue.is_speaking());
}

#[tokio::test]
async fn test_new_utterance_cancels_active_one() {
    let queue = SpeechQueue::new(Some(synthesizer()), Arc::new(TimedSink(Duration::from_millis(300))));
    let mut rx = queue.subscribe();

    let first = queue.speak(Utterance::text("Birinci"));
    assert!(matches!(next(&mut rx).await, UtteranceEvent::Started { id, .. } if id == first));

    let second = queue.speak(Utterance::text("İkinci"));
    assert_ne!(first, second);
    assert_eq!(next(&mut rx).await, UtteranceEvent::Cancelled { id: first });
    assert!(matches!(next(&mut rx).await, UtteranceEvent::Started { id, .. } if id == second));
    assert_eq!(next(&mut rx).await, UtteranceEvent::Ended { id: second });
}

#[tokio::test]
async fn test_each_utterance_gets_one_terminal_event() {
    let queue = SpeechQueue::new(Some(synthesizer()), Arc::new(TimedSink(Duration::from_millis(50))));
    let mut rx = queue.subscribe();

    let ids: Vec<UtteranceId> = (0..5).map(|i| queue.speak(Utterance::text(format!("cümle {}", i)))).collect();

    let mut terminal = Vec::new();
    while terminal.len() < ids.len() {
        let event = next(&mut rx).await;
        if event.is_terminal() {
            terminal.push(event);
        }
    }
    for id in &ids[..4] {
        assert_eq!(terminal.iter().filter(|e| e.id() == *id).count(), 1);
        assert!(terminal.contains(&UtteranceEvent::Cancelled { id: *id }));
    }
    assert_eq!(terminal.last(), Some(&UtteranceEvent::Ended { id: ids[4] }));
}

#[tokio::test]
async fn test_cancel_stops_active_utterance() {
    let queue = SpeechQueue::new(Some(synthesizer()), Arc::new(TimedSink(Duration::from_secs(10))));
    let mut rx = queue.subscribe();

    let id = queue.speak(Utterance::text("Uzun bir konuşma"));
    assert!(matches!(next(&mut rx).await, UtteranceEvent::Started { .. }));

    assert_eq!(queue.cancel(), Some(id));
    assert_eq!(next(&mut rx).await, UtteranceEvent::Cancelled { id });
    assert!(!queue.is_speaking());
    assert_eq!(queue.cancel(), None);
}

#[tokio::test]
async fn test_backend_audio_played_without_synthesis() {
    let queue = SpeechQueue::new(None, Arc::new(TimedSink(Duration::from_millis(10))));
    let mut rx = queue.subscribe();

    let id = queue.speak(Utterance::text("Merhaba").with_audio(Some(Bytes::from_static(b"RIFF"))));
    match next(&mut rx).await {
        UtteranceEvent::Started { audio, .. } => assert_eq!(audio.unwrap().as_ref(), b"RIFF"),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(next(&mut rx).await, UtteranceEvent::Ended { id });
}

#[tokio::test]
async fn test_unplayable_backend_audio_falls_back_to_synthesis() {
    let queue = SpeechQueue::new(Some(synthesizer()), Arc::new(TimedSink(Duration::from_millis(10))));
    let mut rx = queue.subscribe();

    let id = queue.speak(Utterance::text("Merhaba").with_audio(Some(Bytes::from_static(b"bad"))));
    assert!(matches!(next(&mut rx).await, UtteranceEvent::Started { .. }));
    // Started is not repeated for the synthesized retry
    assert_eq!(next(&mut rx).await, UtteranceEvent::Ended { id });
}

#[tokio::test]
async fn test_missing_synthesizer_fails_utterance() {
    let queue = SpeechQueue::new(None, Arc::new(TimedSink(Duration::from_millis(10))));
    let mut rx = queue.subscribe();

    let id = queue.speak(Utterance::text("Merhaba"));
    match next(&mut rx).await {
        UtteranceEvent::Failed { id: failed, error } => {
            assert_eq!(failed, id);
            assert!(error.contains("synthesizer"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(!queue.is_speaking());
}

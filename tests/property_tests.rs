use proptest::prelude::*;
use sima_core::{ChatRequest, SpeechSettings};
use sima_me::MouthShape;
use sima_spk::{estimate_duration, SpeechConfig};
use std::time::Duration;

proptest! {
    #[test]
    fn test_mouth_shape_monotonic(a in 0.0f32..200.0, b in 0.0f32..200.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(MouthShape::from_level(low) <= MouthShape::from_level(high));
    }

    #[test]
    fn test_speech_settings_always_valid(
        rate in -5.0f32..10.0,
        pitch in -5.0f32..5.0,
        volume in -2.0f32..3.0,
    ) {
        let settings = SpeechSettings { rate, pitch, volume, ..SpeechSettings::default() };
        let config = SpeechConfig::from_settings(&settings);
        prop_assert!(config.validate().is_ok());
        prop_assert!(config.rate <= 500);
    }

    #[test]
    fn test_estimate_duration_floor_and_growth(words in 0usize..400, rate in 1u32..500) {
        let text = vec!["kelime"; words].join(" ");
        let shorter = estimate_duration(&text, rate);
        let longer = estimate_duration(&format!("{} ve", text), rate);
        prop_assert!(shorter >= Duration::from_millis(400));
        prop_assert!(longer >= shorter);
    }

    #[test]
    fn test_chat_request_validation_never_panics(figure in ".{0,80}", message in ".{0,200}") {
        let request = ChatRequest::new(figure.clone(), message.clone());
        if request.validate().is_ok() {
            prop_assert!(!figure.trim().is_empty());
            prop_assert!(!message.trim().is_empty());
        }
    }

    #[test]
    fn test_known_figure_ids_validate(message in "[a-zA-Z ]{0,40}[a-z]") {
        for id in ["ataturk", "napoleon", "fatih_sultan_mehmet"] {
            prop_assert!(ChatRequest::new(id, message.clone()).validate().is_ok());
        }
    }
}

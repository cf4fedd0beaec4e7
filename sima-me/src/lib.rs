//! sima-me: Persona avatar state
//!
//! Tracks what the on-screen figure is doing (entrance, idle, speaking,
//! listening, thinking) and which mouth shape it shows while speech plays.

pub mod error;
pub mod config;
pub mod state;
pub mod lip_sync;
pub mod animator;

pub use error::AvatarError;
pub use config::AvatarConfig;
pub use state::{AvatarAnimation, AvatarState, MouthShape};
pub use lip_sync::LipSyncTrack;
pub use animator::AvatarAnimator;

//! Avatar state snapshot

use serde::{Deserialize, Serialize};

/// Animation currently shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarAnimation {
    Entrance,
    Idle,
    Speaking,
    Listening,
    Thinking,
}

/// Mouth opening while speaking
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouthShape {
    Closed,
    SlightlyOpen,
    Open,
    WideOpen,
}

impl MouthShape {
    /// Shape for an amplitude on a 0-100 scale (RMS x 100)
    pub fn from_level(level: f32) -> Self {
        if level < 5.0 {
            MouthShape::Closed
        } else if level < 15.0 {
            MouthShape::SlightlyOpen
        } else if level < 30.0 {
            MouthShape::Open
        } else {
            MouthShape::WideOpen
        }
    }

    /// Index 0 (closed) to 3 (wide open)
    pub fn index(self) -> u8 {
        self as u8
    }
}

/// Observable avatar state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarState {
    pub is_speaking: bool,
    pub is_listening: bool,
    pub is_thinking: bool,
    pub current_animation: AvatarAnimation,
    pub mouth_open: Option<MouthShape>,
}

impl AvatarState {
    pub fn entering() -> Self {
        Self {
            is_speaking: false,
            is_listening: false,
            is_thinking: false,
            current_animation: AvatarAnimation::Entrance,
            mouth_open: None,
        }
    }

    /// Highest priority animation for the flags: Speaking > Listening > Thinking > Idle
    pub fn resolve(&self, entrance_done: bool) -> AvatarAnimation {
        if !entrance_done {
            AvatarAnimation::Entrance
        } else if self.is_speaking {
            AvatarAnimation::Speaking
        } else if self.is_listening {
            AvatarAnimation::Listening
        } else if self.is_thinking {
            AvatarAnimation::Thinking
        } else {
            AvatarAnimation::Idle
        }
    }
}

impl Default for AvatarState {
    fn default() -> Self {
        Self::entering()
    }
}

use serde::{Deserialize, Serialize};

/// Playback state of a player. Exactly one holds at any time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Nothing is advancing; the artboard sits at its starting frame
    #[default]
    Stopped,
    /// Animations advance on every frame
    Playing,
    /// Advancement is suspended at the current frame
    Paused,
}

impl PlaybackState {
    /// Get the name of this playback state
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Playing => "playing",
            Self::Paused => "paused",
        }
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Check if the player can start or resume playing
    #[inline]
    pub fn can_play(&self) -> bool {
        matches!(self, Self::Stopped | Self::Paused)
    }

    /// Check if the player can be paused
    #[inline]
    pub fn can_pause(&self) -> bool {
        matches!(self, Self::Playing)
    }

    /// Check if the player can be stopped
    #[inline]
    pub fn can_stop(&self) -> bool {
        !matches!(self, Self::Stopped)
    }
}

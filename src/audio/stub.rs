//! Stub implementation when audio feature is disabled

use thiserror::Error;
use tracing::debug;

use super::SoundEffect;

/// Errors that can occur during audio playback
#[derive(Debug, Error)]
pub enum AudioError {
    /// Built without the `audio` feature
    #[error("Audio feature not enabled")]
    NotEnabled,
}

/// Stub audio player (logs instead of playing)
#[derive(Debug, Default)]
pub struct AudioPlayer {
    cued: bool,
}

impl AudioPlayer {
    /// Create a new audio player stub
    pub fn new() -> Result<Self, AudioError> {
        debug!("Audio feature not enabled, using stub player");
        Ok(Self::default())
    }

    /// Set volume (no-op)
    pub fn set_volume(&mut self, _volume: f32) {}

    /// Remember that a sound was cued
    pub fn cue(&mut self, sound: &SoundEffect, _repeat: u32) -> Result<(), AudioError> {
        debug!(sound = ?sound, "Cue skipped (audio feature not enabled)");
        self.cued = true;
        Ok(())
    }

    /// Whether a cue is pending
    pub fn is_cued(&self) -> bool {
        self.cued
    }

    /// Consume the cue without playing
    pub fn play_cued(&mut self) -> Result<(), AudioError> {
        debug!("Audio playback skipped (feature not enabled)");
        self.cued = false;
        Ok(())
    }

    /// Play sound (no-op)
    pub fn play(&mut self, _sound: &SoundEffect, _repeat: u32) -> Result<(), AudioError> {
        debug!("Audio playback skipped (feature not enabled)");
        Ok(())
    }

    /// Never playing
    pub fn is_playing(&self) -> bool {
        false
    }

    /// Stop (no-op)
    pub fn stop(&mut self) {}
}

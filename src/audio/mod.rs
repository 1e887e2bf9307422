//! Audio playback started by the countdown
//!
//! The sound is cued paused ahead of time so that firing only has to resume
//! the sink. Real output needs the `audio` feature; without it a stub player
//! logs and does nothing.

#[cfg(feature = "audio")]
mod player;

#[cfg(feature = "audio")]
pub use player::{AudioError, AudioPlayer};

#[cfg(not(feature = "audio"))]
mod stub;

#[cfg(not(feature = "audio"))]
pub use stub::{AudioError, AudioPlayer};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::countdown::PlaybackTrigger;

/// Sound to play at the target instant
#[derive(Debug, Clone, PartialEq)]
pub enum SoundEffect {
    /// Generated tone by name (alarm, chime, notification, beep)
    Builtin(String),
    /// Audio file on disk
    File(PathBuf),
}

impl Default for SoundEffect {
    fn default() -> Self {
        SoundEffect::Builtin("chime".to_string())
    }
}

impl SoundEffect {
    /// Parse a sound from configuration: a path if it looks like one, a
    /// built-in tone name otherwise
    pub fn from_config(value: &str) -> Self {
        let is_path = value.contains('/')
            || value.contains('\\')
            || [".ogg", ".wav", ".mp3", ".flac", ".m4a"]
                .iter()
                .any(|ext| value.ends_with(ext));

        if is_path {
            SoundEffect::File(PathBuf::from(value))
        } else {
            SoundEffect::Builtin(value.to_string())
        }
    }
}

/// Sound configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundConfig {
    /// Whether firing produces sound at all
    #[serde(default = "default_sound_enabled")]
    pub enabled: bool,

    /// Built-in tone name or audio file path
    #[serde(default = "default_effect")]
    pub effect: String,

    /// Volume level (0.0 to 1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,

    /// Number of times the sound is queued
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

fn default_sound_enabled() -> bool {
    true
}

fn default_effect() -> String {
    "chime".to_string()
}

fn default_volume() -> f32 {
    0.8
}

fn default_repeat() -> u32 {
    1
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            enabled: default_sound_enabled(),
            effect: default_effect(),
            volume: default_volume(),
            repeat: default_repeat(),
        }
    }
}

/// Playback trigger that starts a cued sound
pub struct AudioTrigger {
    player: AudioPlayer,
    sound: SoundEffect,
    repeat: u32,
    enabled: bool,
}

impl AudioTrigger {
    /// Build a trigger from configuration and cue the sound
    pub fn new(mut player: AudioPlayer, config: &SoundConfig) -> Self {
        player.set_volume(config.volume);
        let mut trigger = Self {
            player,
            sound: SoundEffect::from_config(&config.effect),
            repeat: config.repeat.max(1),
            enabled: config.enabled,
        };
        trigger.cue();
        trigger
    }

    /// Load the sound paused so the next fire starts it without decoding
    pub fn cue(&mut self) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.player.cue(&self.sound, self.repeat) {
            warn!(error = %e, sound = ?self.sound, "Failed to cue sound, will load on fire");
        }
    }

    /// Whether playback is still audible
    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    /// Stop playback
    pub fn stop(&mut self) {
        self.player.stop();
    }

    /// Sound played on fire
    pub fn sound(&self) -> &SoundEffect {
        &self.sound
    }
}

impl PlaybackTrigger for AudioTrigger {
    fn fire(&mut self) {
        if !self.enabled {
            info!("Sound disabled, nothing to play");
            return;
        }
        if self.player.is_playing() {
            debug!("Playback already running");
            return;
        }

        let result = if self.player.is_cued() {
            self.player.play_cued()
        } else {
            self.player.play(&self.sound, self.repeat)
        };

        match result {
            Ok(()) => info!(sound = ?self.sound, "Playback started"),
            Err(e) => error!(error = %e, sound = ?self.sound, "Playback failed"),
        }
    }
}

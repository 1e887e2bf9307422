//! Audio player implementation using rodio

use rodio::source::SineWave;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::SoundEffect;

/// Errors that can occur during audio playback
#[derive(Debug, Error)]
pub enum AudioError {
    /// No output device or stream
    #[error("Failed to create output stream: {0}")]
    StreamError(String),

    /// The sound file could not be decoded
    #[error("Failed to decode audio: {0}")]
    DecodeError(String),

    /// The sound file does not exist
    #[error("Sound file not found: {0}")]
    FileNotFound(std::path::PathBuf),

    /// `play_cued` called with no cued sink
    #[error("No sound cued")]
    NothingCued,
}

/// Audio player with one cued and one active sink
pub struct AudioPlayer {
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
    volume: f32,
    cued: Option<Sink>,
    active: Option<Sink>,
}

impl AudioPlayer {
    /// Open the default output device
    pub fn new() -> Result<Self, AudioError> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| AudioError::StreamError(e.to_string()))?;

        info!("Audio output opened");

        Ok(Self {
            _stream: stream,
            stream_handle,
            volume: 0.8,
            cued: None,
            active: None,
        })
    }

    /// Set the volume (0.0 to 1.0)
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    /// Decode `sound` into a paused sink, replacing any previous cue
    pub fn cue(&mut self, sound: &SoundEffect, repeat: u32) -> Result<(), AudioError> {
        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| AudioError::StreamError(e.to_string()))?;
        sink.pause();
        sink.set_volume(self.volume);

        for _ in 0..repeat.max(1) {
            match sound {
                SoundEffect::Builtin(name) => sink.append(tone(name)),
                SoundEffect::File(path) => sink.append(decode(path)?),
            }
        }

        debug!(sound = ?sound, repeat, "Sound cued");
        self.cued = Some(sink);
        Ok(())
    }

    /// Whether a paused sound is waiting
    pub fn is_cued(&self) -> bool {
        self.cued.is_some()
    }

    /// Resume the cued sink
    pub fn play_cued(&mut self) -> Result<(), AudioError> {
        let sink = self.cued.take().ok_or(AudioError::NothingCued)?;
        sink.play();
        self.active = Some(sink);
        Ok(())
    }

    /// Cue and immediately play `sound`
    pub fn play(&mut self, sound: &SoundEffect, repeat: u32) -> Result<(), AudioError> {
        self.cue(sound, repeat)?;
        self.play_cued()
    }

    /// Whether the active sink still has audio queued
    pub fn is_playing(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|sink| !sink.is_paused() && !sink.empty())
    }

    /// Stop the active sink
    pub fn stop(&mut self) {
        if let Some(sink) = self.active.take() {
            sink.stop();
        }
    }
}

fn tone(name: &str) -> impl Source<Item = f32> + Send + 'static {
    let (frequency, duration_ms) = match name {
        "alarm" => (880.0, 500),
        "chime" => (523.25, 300),
        "notification" => (659.25, 150),
        "beep" => (440.0, 100),
        _ => {
            warn!(sound = %name, "Unknown builtin sound, using beep");
            (440.0, 100)
        }
    };

    SineWave::new(frequency)
        .take_duration(Duration::from_millis(duration_ms))
        .amplify(0.5)
}

fn decode(path: &Path) -> Result<Decoder<BufReader<File>>, AudioError> {
    if !path.exists() {
        return Err(AudioError::FileNotFound(path.to_path_buf()));
    }

    let file = File::open(path).map_err(|e| AudioError::DecodeError(e.to_string()))?;
    Decoder::new(BufReader::new(file)).map_err(|e| AudioError::DecodeError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_missing_file() {
        let result = decode(Path::new("/nonexistent/001.m4a"));
        assert!(matches!(result, Err(AudioError::FileNotFound(_))));
    }

    #[test]
    fn test_tone_is_bounded() {
        let source = tone("alarm");
        assert_eq!(source.total_duration(), Some(Duration::from_millis(500)));
    }
}

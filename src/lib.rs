//! Timed Playback Library
//!
//! Counts down to a wall-clock instant and starts audio playback exactly
//! at that instant. A coarse one-second ticker drives the display while a
//! precise one-shot timer, armed during the final seconds, fires playback.
//! Exposes modules for clocks, timers, the countdown state machine, audio,
//! clock-offset probing and configuration.

#![warn(missing_docs)]

pub mod audio;
pub mod clock;
pub mod config;
pub mod countdown;
pub mod error;
pub mod metrics;
pub mod offset;
pub mod timer;

// Re-export commonly used types
pub use audio::{AudioPlayer, AudioTrigger, SoundConfig, SoundEffect};
pub use clock::{Clock, EpochMillis, OffsetClock, SystemClock};
pub use config::{Config, ScheduleConfig, TimeSyncConfig};
pub use countdown::{
    display_string, parse_target, CountdownSettings, CountdownUpdate, LateStartPolicy, Phase,
    PlaybackTrigger, RemainingDisplay, ScheduledCountdown,
};
pub use error::{ConfigError, CountdownError, ProbeError, TimerError};
pub use metrics::SessionMetrics;
pub use offset::{OffsetService, ProbeState, TimeOffsetProbe};
pub use timer::{LoopTimer, LoopTimers, OneShotTimer, SessionId, Ticker, TimerEvent};

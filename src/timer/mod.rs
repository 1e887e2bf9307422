//! Timer abstractions driving the countdown
//!
//! A countdown never runs code from inside a timer. Each scheduled timer
//! carries a [`TimerEvent`] that the event loop hands back to the owner when
//! the timer expires. Handles are owned resources: dropping one releases the
//! timer, and a released timer never delivers its event.

mod event_loop;

pub use event_loop::{LoopTimer, LoopTimers};

use std::fmt;
use std::time::Duration;

use crate::error::TimerError;

/// Identifies one countdown session
///
/// Events tagged with an older session are stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Wrap a raw session number
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw session number
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The session started after this one
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Event delivered when a timer expires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Periodic sample of the remaining time
    Tick(SessionId),
    /// The precise one-shot reached the target instant
    Fire(SessionId),
}

impl TimerEvent {
    /// Session the event belongs to
    pub fn session(&self) -> SessionId {
        match self {
            TimerEvent::Tick(id) | TimerEvent::Fire(id) => *id,
        }
    }
}

/// Repeating timer source
pub trait Ticker {
    /// Owned registration; dropping it stops the ticker
    type Handle;

    /// Deliver `event` every `interval` until the handle is released
    fn schedule_repeating(
        &mut self,
        interval: Duration,
        event: TimerEvent,
    ) -> Result<Self::Handle, TimerError>;

    /// Release a repeating timer
    fn cancel_repeating(&mut self, handle: Self::Handle) {
        drop(handle);
    }
}

/// Delayed single-shot timer source
pub trait OneShotTimer {
    /// Owned registration; dropping it cancels the pending shot
    type Handle;

    /// Deliver `event` once after `delay` unless the handle is released first
    fn schedule_once(
        &mut self,
        delay: Duration,
        event: TimerEvent,
    ) -> Result<Self::Handle, TimerError>;

    /// Release a one-shot timer, fired or not
    fn cancel_once(&mut self, handle: Self::Handle) {
        drop(handle);
    }
}

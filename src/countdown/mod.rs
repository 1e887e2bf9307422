//! Scheduled countdown to an exact playback instant
//!
//! A coarse ticker samples the remaining time for display. Once the
//! remaining time drops inside the arm threshold, a one-shot timer is
//! scheduled for exactly the remaining milliseconds, and that shot starts
//! playback. Every sample is derived from `target - now`, so tick jitter
//! never accumulates.
//!
//! All state lives on one event loop. Timer callbacks arrive as
//! [`TimerEvent`]s tagged with their session, and every handler checks the
//! current phase and session before acting.

mod display;
mod target;

pub use display::{display_string, RemainingDisplay};
pub use target::{parse_target, parse_target_millis};

use std::mem;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use crate::clock::{Clock, EpochMillis};
use crate::error::{CountdownError, CountdownResult};
use crate::metrics::SessionMetrics;
use crate::timer::{OneShotTimer, SessionId, Ticker, TimerEvent};

/// Sampling cadence of the countdown ticker
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1_000);

/// Remaining time below which the precise one-shot is armed
pub const DEFAULT_ARM_THRESHOLD: Duration = Duration::from_millis(10_000);

/// Action started at the target instant
pub trait PlaybackTrigger {
    /// Start playback. Called at most once per session.
    fn fire(&mut self);
}

impl<F: FnMut()> PlaybackTrigger for F {
    fn fire(&mut self) {
        self()
    }
}

/// What `start()` does with a target that is not in the future
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LateStartPolicy {
    /// Refuse with [`CountdownError::PastTarget`] and leave everything as is
    #[default]
    Refuse,
    /// Fire playback right away without scheduling any timer
    #[serde(rename = "fire")]
    FireImmediately,
}

/// Countdown tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownSettings {
    /// Sampling cadence of the ticker
    pub tick_interval: Duration,
    /// Remaining time below which the one-shot is armed
    pub arm_threshold: Duration,
    /// Handling of targets that are not in the future
    pub late_start: LateStartPolicy,
}

impl Default for CountdownSettings {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            arm_threshold: DEFAULT_ARM_THRESHOLD,
            late_start: LateStartPolicy::default(),
        }
    }
}

/// Lifecycle phase of the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No session
    Idle,
    /// Ticker running, one-shot not yet armed
    Counting,
    /// One-shot scheduled for the target instant
    ArmedForFire,
    /// Playback started; terminal until reset
    Fired,
    /// Session cancelled before firing
    Cancelled,
}

impl Phase {
    /// Whether a session with timers is running
    pub fn is_live(&self) -> bool {
        matches!(self, Phase::Counting | Phase::ArmedForFire)
    }
}

/// Notification sent to observers after every state change or sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownUpdate {
    /// Session the update belongs to
    pub session: Option<SessionId>,
    /// Phase after the change
    pub phase: Phase,
    /// Remaining time at the last sample, `Some(0)` once fired
    pub remaining_millis: Option<i64>,
}

impl CountdownUpdate {
    /// Display projection of the remaining time
    pub fn display(&self) -> Option<RemainingDisplay> {
        RemainingDisplay::from_millis(self.remaining_millis)
    }
}

#[derive(Debug, Clone, Copy)]
struct Session {
    id: SessionId,
    target: EpochMillis,
    remaining_millis: Option<i64>,
}

impl Session {
    fn new(id: SessionId, target: EpochMillis) -> Self {
        Self {
            id,
            target,
            remaining_millis: None,
        }
    }
}

// Handles exist only in the phases that own them.
enum State<Tk, Os> {
    Idle,
    Counting {
        session: Session,
        ticker: Tk,
    },
    ArmedForFire {
        session: Session,
        ticker: Tk,
        one_shot: Os,
    },
    Fired {
        session: Session,
    },
    Cancelled,
}

impl<Tk, Os> State<Tk, Os> {
    fn phase(&self) -> Phase {
        match self {
            State::Idle => Phase::Idle,
            State::Counting { .. } => Phase::Counting,
            State::ArmedForFire { .. } => Phase::ArmedForFire,
            State::Fired { .. } => Phase::Fired,
            State::Cancelled => Phase::Cancelled,
        }
    }

    fn session(&self) -> Option<&Session> {
        match self {
            State::Counting { session, .. }
            | State::ArmedForFire { session, .. }
            | State::Fired { session } => Some(session),
            State::Idle | State::Cancelled => None,
        }
    }
}

type StateOf<T> = State<<T as Ticker>::Handle, <T as OneShotTimer>::Handle>;

type Listener = Box<dyn FnMut(&CountdownUpdate)>;

/// Countdown that starts playback at one target instant at a time
pub struct ScheduledCountdown<C, T, P>
where
    T: Ticker + OneShotTimer,
{
    clock: C,
    timers: T,
    trigger: P,
    settings: CountdownSettings,
    state: StateOf<T>,
    last_session: SessionId,
    listeners: Vec<Listener>,
    metrics: SessionMetrics,
}

impl<C, T, P> ScheduledCountdown<C, T, P>
where
    T: Ticker + OneShotTimer,
{
    // Moves to Idle, releasing whatever the previous phase owned.
    fn release_handles(&mut self) -> Option<Session> {
        match mem::replace(&mut self.state, State::Idle) {
            State::Counting { session, ticker } => {
                self.timers.cancel_repeating(ticker);
                Some(session)
            }
            State::ArmedForFire {
                session,
                ticker,
                one_shot,
            } => {
                self.timers.cancel_repeating(ticker);
                self.timers.cancel_once(one_shot);
                Some(session)
            }
            State::Fired { session } => Some(session),
            State::Idle | State::Cancelled => None,
        }
    }
}

impl<C, T, P> ScheduledCountdown<C, T, P>
where
    C: Clock,
    T: Ticker + OneShotTimer,
    P: PlaybackTrigger,
{
    /// Create an idle countdown
    pub fn new(clock: C, timers: T, trigger: P, settings: CountdownSettings) -> Self {
        Self {
            clock,
            timers,
            trigger,
            settings,
            state: State::Idle,
            last_session: SessionId::new(0),
            listeners: Vec::new(),
            metrics: SessionMetrics::new(),
        }
    }

    /// Register an observer for countdown updates
    pub fn subscribe(&mut self, listener: impl FnMut(&CountdownUpdate) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Start counting down to `target`
    ///
    /// Any running session is torn down first. A target that is not in the
    /// future is handled by the configured [`LateStartPolicy`]; refusing
    /// leaves the current state untouched.
    pub fn start(&mut self, target: EpochMillis) -> CountdownResult<SessionId> {
        if let State::Fired { session } = &self.state {
            warn!(session = %session.id, "Playback already fired, reset required");
            return Err(CountdownError::AlreadyFired);
        }

        let now = self.clock.now_millis();
        if target <= now {
            return match self.settings.late_start {
                LateStartPolicy::Refuse => {
                    info!(target, now, "Target already passed, countdown not started");
                    Err(CountdownError::PastTarget { target, now })
                }
                LateStartPolicy::FireImmediately => Ok(self.fire_late(target, now)),
            };
        }

        if let Some(previous) = self.release_handles() {
            debug!(session = %previous.id, "Replacing running countdown");
        }

        let id = self.next_session();
        let ticker = match self
            .timers
            .schedule_repeating(self.settings.tick_interval, TimerEvent::Tick(id))
        {
            Ok(ticker) => ticker,
            Err(e) => {
                error!(session = %id, error = %e, "Failed to start countdown ticker");
                self.notify();
                return Err(e.into());
            }
        };

        self.metrics.reset();
        self.state = State::Counting {
            session: Session::new(id, target),
            ticker,
        };

        info!(
            session = %id,
            target,
            remaining_ms = target - now,
            "Countdown started"
        );

        // First sample now rather than one interval late.
        if !self.sample(id) {
            self.notify();
        }

        Ok(id)
    }

    /// Cancel the running session
    ///
    /// Releases both timers and moves to [`Phase::Cancelled`]. No-op unless a
    /// session is counting or armed.
    pub fn cancel(&mut self) {
        if !self.phase().is_live() {
            trace!(phase = ?self.phase(), "Nothing to cancel");
            return;
        }

        if let Some(session) = self.release_handles() {
            info!(session = %session.id, "Countdown cancelled");
        }
        self.state = State::Cancelled;
        self.notify();
    }

    /// Release everything and return to [`Phase::Idle`] from any phase
    pub fn reset(&mut self) {
        if matches!(self.state, State::Idle) {
            return;
        }

        self.release_handles();
        self.metrics.reset();
        info!("Countdown reset");
        self.notify();
    }

    /// Re-sample after the clock was corrected
    ///
    /// An armed one-shot is rescheduled for the corrected `target - now`, or
    /// fires right away if the corrected target has already passed.
    pub fn resync(&mut self) {
        if !self.phase().is_live() {
            return;
        }
        let Some(id) = self.session_id() else {
            return;
        };

        if let State::ArmedForFire { session, .. } = &self.state {
            if session.target <= self.clock.now_millis() {
                debug!(session = %id, "Corrected target already reached");
                self.fire(id);
                return;
            }
        }

        self.disarm();
        debug!(session = %id, "Resampling after clock correction");
        self.sample(id);
    }

    // ArmedForFire -> Counting, releasing the one-shot.
    fn disarm(&mut self) {
        match mem::replace(&mut self.state, State::Idle) {
            State::ArmedForFire {
                session,
                ticker,
                one_shot,
            } => {
                self.timers.cancel_once(one_shot);
                self.state = State::Counting { session, ticker };
            }
            other => self.state = other,
        }
    }

    /// Handle an expired timer
    pub fn on_timer(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::Tick(id) => self.tick(id),
            TimerEvent::Fire(id) => self.fire(id),
        }
    }

    /// Periodic sample for session `id`
    ///
    /// Ticks for other sessions, ticks outside a live phase and late ticks
    /// while armed are ignored. A late tick before arming ends the session
    /// according to the [`LateStartPolicy`].
    pub fn tick(&mut self, id: SessionId) {
        self.sample(id);
    }

    // Returns whether observers were notified.
    fn sample(&mut self, id: SessionId) -> bool {
        let now = self.clock.now_millis();

        let (session, armed) = match &mut self.state {
            State::Counting { session, .. } => (session, false),
            State::ArmedForFire { session, .. } => (session, true),
            _ => {
                trace!(session = %id, "Ignoring tick outside a live countdown");
                return false;
            }
        };

        if session.id != id {
            trace!(session = %id, current = %session.id, "Ignoring stale tick");
            return false;
        }

        let remaining = session.target - now;
        if remaining < 0 {
            if armed {
                debug!(session = %id, remaining_ms = remaining, "Late tick ignored");
                return false;
            }
            // No tick landed inside the arm window; nothing is left to fire.
            self.miss_window(id, now);
            return true;
        }
        session.remaining_millis = Some(remaining);

        let interval_ms = duration_millis(self.settings.tick_interval);
        self.metrics.record_tick(now, interval_ms);
        debug!(session = %id, remaining_ms = remaining, "Countdown tick");

        if !armed && remaining < duration_millis(self.settings.arm_threshold) {
            self.arm(id, remaining);
        }

        self.notify();
        true
    }

    fn arm(&mut self, id: SessionId, remaining: i64) {
        let delay = Duration::from_millis(u64::try_from(remaining).unwrap_or(0));
        let one_shot = match self.timers.schedule_once(delay, TimerEvent::Fire(id)) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(session = %id, error = %e, "Failed to arm playback, retrying next tick");
                return;
            }
        };

        match mem::replace(&mut self.state, State::Idle) {
            State::Counting { session, ticker } => {
                info!(session = %id, delay_ms = remaining, "Playback armed");
                self.state = State::ArmedForFire {
                    session,
                    ticker,
                    one_shot,
                };
            }
            other => {
                self.state = other;
                self.timers.cancel_once(one_shot);
            }
        }
    }

    fn fire(&mut self, id: SessionId) {
        match mem::replace(&mut self.state, State::Idle) {
            State::ArmedForFire {
                mut session,
                ticker,
                one_shot,
            } if session.id == id => {
                let now = self.clock.now_millis();

                self.trigger.fire();
                self.timers.cancel_repeating(ticker);
                self.timers.cancel_once(one_shot);

                session.remaining_millis = Some(0);
                self.metrics.record_fire(now, session.target);
                let lateness_ms = now - session.target;
                if self.metrics.is_fire_late() {
                    warn!(session = %id, lateness_ms, "Playback fired off target");
                } else {
                    info!(session = %id, lateness_ms, "Playback fired");
                }
                self.metrics.log_summary();

                self.state = State::Fired { session };
                self.notify();
            }
            other => {
                debug!(session = %id, phase = ?other.phase(), "Ignoring stale fire");
                self.state = other;
            }
        }
    }

    // Ends a session whose target passed before the one-shot was armed.
    fn miss_window(&mut self, id: SessionId, now: EpochMillis) {
        let Some(mut session) = self.release_handles() else {
            return;
        };
        let late_ms = now - session.target;

        match self.settings.late_start {
            LateStartPolicy::Refuse => {
                warn!(session = %id, late_ms, "Arm window missed, countdown abandoned");
                self.state = State::Cancelled;
            }
            LateStartPolicy::FireImmediately => {
                warn!(session = %id, late_ms, "Arm window missed, firing now");
                self.trigger.fire();
                self.metrics.record_fire(now, session.target);
                self.metrics.log_summary();
                session.remaining_millis = Some(0);
                self.state = State::Fired { session };
            }
        }
        self.notify();
    }

    fn fire_late(&mut self, target: EpochMillis, now: EpochMillis) -> SessionId {
        self.release_handles();
        let id = self.next_session();
        warn!(session = %id, late_ms = now - target, "Target already passed, firing now");

        self.trigger.fire();

        self.metrics.reset();
        self.metrics.record_fire(now, target);
        let mut session = Session::new(id, target);
        session.remaining_millis = Some(0);
        self.state = State::Fired { session };
        self.notify();
        id
    }

    fn next_session(&mut self) -> SessionId {
        self.last_session = self.last_session.next();
        self.last_session
    }

    fn notify(&mut self) {
        let update = self.snapshot();
        for listener in &mut self.listeners {
            listener(&update);
        }
    }

    /// Current state as an observer would see it
    pub fn snapshot(&self) -> CountdownUpdate {
        CountdownUpdate {
            session: self.session_id(),
            phase: self.phase(),
            remaining_millis: self.remaining_millis(),
        }
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Session being counted down or fired, if any
    pub fn session_id(&self) -> Option<SessionId> {
        self.state.session().map(|s| s.id)
    }

    /// Target of the current session
    pub fn target(&self) -> Option<EpochMillis> {
        self.state.session().map(|s| s.target)
    }

    /// Remaining time at the last sample
    pub fn remaining_millis(&self) -> Option<i64> {
        self.state.session().and_then(|s| s.remaining_millis)
    }

    /// Display projection of the remaining time
    pub fn display(&self) -> Option<RemainingDisplay> {
        RemainingDisplay::from_millis(self.remaining_millis())
    }

    /// Countdown tuning
    pub fn settings(&self) -> &CountdownSettings {
        &self.settings
    }

    /// Timing metrics of the current session
    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    /// Clock used for every sample
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Playback trigger
    pub fn trigger(&self) -> &P {
        &self.trigger
    }

    /// Playback trigger, mutably
    pub fn trigger_mut(&mut self) -> &mut P {
        &mut self.trigger
    }
}

impl<C, T, P> Drop for ScheduledCountdown<C, T, P>
where
    T: Ticker + OneShotTimer,
{
    fn drop(&mut self) {
        if let Some(session) = self.release_handles() {
            debug!(session = %session.id, "Countdown dropped, timers released");
        }
    }
}

fn duration_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

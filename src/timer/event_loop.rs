// calloop-backed timers
//
// Every timer is a calloop `Timer` source whose callback forwards its event to
// the loop's shared data through a plain function pointer. Releasing a handle
// removes its source from the loop right away. The handle and source also
// share a liveness flag, so a source released from inside a callback of the
// same dispatch never delivers again.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use calloop::timer::{TimeoutAction, Timer};
use calloop::{LoopHandle, RegistrationToken};
use tracing::trace;

use super::{OneShotTimer, Ticker, TimerEvent};
use crate::error::TimerError;

/// Ticker and one-shot timer backed by a calloop event loop
pub struct LoopTimers<Data: 'static> {
    handle: LoopHandle<'static, Data>,
    dispatch: fn(&mut Data, TimerEvent),
}

impl<Data: 'static> LoopTimers<Data> {
    /// Create timers on `handle`; `dispatch` routes expired events into the
    /// loop data (usually to `ScheduledCountdown::on_timer`)
    pub fn new(handle: LoopHandle<'static, Data>, dispatch: fn(&mut Data, TimerEvent)) -> Self {
        Self { handle, dispatch }
    }

    fn insert(
        &self,
        delay: Duration,
        event: TimerEvent,
        repeat: Option<Duration>,
    ) -> Result<LoopTimer<Data>, TimerError> {
        let live = Rc::new(Cell::new(true));
        let flag = Rc::clone(&live);
        let dispatch = self.dispatch;

        let token = self
            .handle
            .insert_source(Timer::from_duration(delay), move |_deadline, _, data| {
                if !flag.get() {
                    trace!(?event, "Retiring released timer");
                    return TimeoutAction::Drop;
                }

                dispatch(data, event);

                match repeat {
                    Some(interval) if flag.get() => TimeoutAction::ToDuration(interval),
                    _ => {
                        flag.set(false);
                        TimeoutAction::Drop
                    }
                }
            })
            .map_err(|e| TimerError::Insert(format!("{:?}", e)))?;

        Ok(LoopTimer {
            live,
            token,
            handle: self.handle.clone(),
        })
    }
}

impl<Data: 'static> Ticker for LoopTimers<Data> {
    type Handle = LoopTimer<Data>;

    fn schedule_repeating(
        &mut self,
        interval: Duration,
        event: TimerEvent,
    ) -> Result<LoopTimer<Data>, TimerError> {
        trace!(?event, interval_ms = interval.as_millis() as u64, "Scheduling ticker");
        self.insert(interval, event, Some(interval))
    }
}

impl<Data: 'static> OneShotTimer for LoopTimers<Data> {
    type Handle = LoopTimer<Data>;

    fn schedule_once(
        &mut self,
        delay: Duration,
        event: TimerEvent,
    ) -> Result<LoopTimer<Data>, TimerError> {
        trace!(?event, delay_ms = delay.as_millis() as u64, "Scheduling one-shot");
        self.insert(delay, event, None)
    }
}

/// Handle to a timer registered with [`LoopTimers`]
///
/// Dropping the handle removes the timer source from the loop.
pub struct LoopTimer<Data: 'static> {
    live: Rc<Cell<bool>>,
    token: RegistrationToken,
    handle: LoopHandle<'static, Data>,
}

impl<Data: 'static> LoopTimer<Data> {
    /// Whether the timer can still deliver its event
    pub fn is_active(&self) -> bool {
        self.live.get()
    }
}

impl<Data: 'static> Drop for LoopTimer<Data> {
    fn drop(&mut self) {
        self.live.set(false);
        // Tokens are versioned, so removing an already retired source is a no-op.
        self.handle.remove(self.token);
    }
}

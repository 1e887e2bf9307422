//! Wall-clock sources
//!
//! The countdown compares absolute instants, so every source reports
//! milliseconds since the Unix epoch.

use std::cell::Cell;
use std::rc::Rc;

/// Milliseconds since the Unix epoch
pub type EpochMillis = i64;

/// Source of the current wall-clock time
pub trait Clock {
    /// Current time in epoch milliseconds
    fn now_millis(&self) -> EpochMillis;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_millis(&self) -> EpochMillis {
        (**self).now_millis()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now_millis(&self) -> EpochMillis {
        (**self).now_millis()
    }
}

/// Local system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> EpochMillis {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock corrected by an offset that can change while a countdown runs
///
/// The offset is shared so a time authority probe can update it after the
/// countdown has been built; the next tick picks the correction up.
#[derive(Debug, Clone)]
pub struct OffsetClock<C> {
    inner: C,
    offset: Rc<Cell<i64>>,
}

impl<C: Clock> OffsetClock<C> {
    /// Wrap `inner` with a zero offset
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            offset: Rc::new(Cell::new(0)),
        }
    }

    /// Shared handle to the offset applied to every reading
    pub fn offset_handle(&self) -> Rc<Cell<i64>> {
        Rc::clone(&self.offset)
    }

    /// Replace the current correction
    pub fn set_offset(&self, offset_millis: i64) {
        self.offset.set(offset_millis);
    }

    /// Current correction in milliseconds
    pub fn offset(&self) -> i64 {
        self.offset.get()
    }
}

impl<C: Clock> Clock for OffsetClock<C> {
    fn now_millis(&self) -> EpochMillis {
        self.inner.now_millis() + self.offset.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(EpochMillis);

    impl Clock for Fixed {
        fn now_millis(&self) -> EpochMillis {
            self.0
        }
    }

    #[test]
    fn test_system_clock_is_epoch_based() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now_millis() > 1_577_836_800_000);
    }

    #[test]
    fn test_offset_clock_applies_correction() {
        let clock = OffsetClock::new(Fixed(10_000));
        assert_eq!(clock.now_millis(), 10_000);

        clock.set_offset(-250);
        assert_eq!(clock.now_millis(), 9_750);
        assert_eq!(clock.offset(), -250);
    }

    #[test]
    fn test_offset_handle_is_shared() {
        let clock = OffsetClock::new(Fixed(0));
        let handle = clock.offset_handle();
        handle.set(1_500);
        assert_eq!(clock.now_millis(), 1_500);
    }
}

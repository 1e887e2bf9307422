//! End-to-end countdown on a real calloop event loop
//!
//! Uses short intervals so the whole session runs in well under a second.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use calloop::EventLoop;
use timed_playback::{
    Clock, CountdownSettings, EpochMillis, LateStartPolicy, LoopTimers, Phase, ScheduledCountdown,
    SystemClock, TimerEvent,
};

struct Harness {
    countdown: ScheduledCountdown<SystemClock, LoopTimers<Harness>, Box<dyn FnMut()>>,
}

impl Harness {
    fn on_timer(&mut self, event: TimerEvent) {
        self.countdown.on_timer(event);
    }
}

fn setup(fired_at: &Rc<RefCell<Vec<EpochMillis>>>) -> (EventLoop<'static, Harness>, Harness) {
    let event_loop: EventLoop<'static, Harness> = EventLoop::try_new().unwrap();
    let timers = LoopTimers::new(event_loop.handle(), Harness::on_timer);
    let record = Rc::clone(fired_at);
    let settings = CountdownSettings {
        tick_interval: Duration::from_millis(20),
        arm_threshold: Duration::from_millis(200),
        late_start: LateStartPolicy::Refuse,
    };
    let countdown = ScheduledCountdown::new(
        SystemClock,
        timers,
        Box::new(move || record.borrow_mut().push(SystemClock.now_millis())) as Box<dyn FnMut()>,
        settings,
    );
    (event_loop, Harness { countdown })
}

fn run_until(
    event_loop: &mut EventLoop<'static, Harness>,
    harness: &mut Harness,
    limit: Duration,
    done: impl Fn(&Harness) -> bool,
) {
    let start = Instant::now();
    while !done(harness) && start.elapsed() < limit {
        event_loop
            .dispatch(Some(Duration::from_millis(5)), harness)
            .unwrap();
    }
}

#[test]
fn test_fires_once_near_target() {
    let fired_at = Rc::new(RefCell::new(Vec::new()));
    let (mut event_loop, mut harness) = setup(&fired_at);

    let target = SystemClock.now_millis() + 400;
    harness.countdown.start(target).unwrap();
    assert_eq!(harness.countdown.phase(), Phase::Counting);

    run_until(&mut event_loop, &mut harness, Duration::from_secs(3), |h| {
        h.countdown.phase() == Phase::Fired
    });
    assert_eq!(harness.countdown.phase(), Phase::Fired);

    // Keep dispatching: nothing may fire twice
    run_until(&mut event_loop, &mut harness, Duration::from_millis(150), |_| false);

    let fired = fired_at.borrow();
    assert_eq!(fired.len(), 1);
    let lateness = fired[0] - target;
    assert!(
        (-5..150).contains(&lateness),
        "fired {} ms away from target",
        lateness
    );
}

#[test]
fn test_cancelled_session_stays_silent() {
    let fired_at = Rc::new(RefCell::new(Vec::new()));
    let (mut event_loop, mut harness) = setup(&fired_at);

    let target = SystemClock.now_millis() + 150;
    harness.countdown.start(target).unwrap();
    assert_eq!(harness.countdown.phase(), Phase::ArmedForFire);

    harness.countdown.cancel();
    run_until(&mut event_loop, &mut harness, Duration::from_millis(300), |_| false);

    assert!(fired_at.borrow().is_empty());
    assert_eq!(harness.countdown.phase(), Phase::Cancelled);
}

#[test]
fn test_past_target_schedules_nothing() {
    let fired_at = Rc::new(RefCell::new(Vec::new()));
    let (mut event_loop, mut harness) = setup(&fired_at);

    let target = SystemClock.now_millis() - 1_000;
    assert!(harness.countdown.start(target).is_err());

    run_until(&mut event_loop, &mut harness, Duration::from_millis(100), |_| false);
    assert!(fired_at.borrow().is_empty());
    assert_eq!(harness.countdown.phase(), Phase::Idle);
}

// Timed Playback - start audio at an exact wall-clock instant
// Counts down on a calloop event loop and fires a cued sound on target

use anyhow::{Context, Result};
use calloop::channel::Event as ChannelEvent;
use calloop::signals::{Signal, Signals};
use calloop::{EventLoop, LoopSignal};
use chrono::Local;
use std::time::Duration;

use timed_playback::{
    config::Config,
    countdown::{parse_target, Phase, ScheduledCountdown},
    error::{CountdownError, ProbeResult},
    offset::{OffsetService, TimeOffsetProbe},
    timer::{LoopTimers, TimerEvent},
    AudioPlayer, AudioTrigger, OffsetClock, SystemClock,
};

type Countdown = ScheduledCountdown<OffsetClock<SystemClock>, LoopTimers<App>, AudioTrigger>;

/// Main application state
struct App {
    countdown: Countdown,
    probe: TimeOffsetProbe,
    signal: LoopSignal,
}

impl App {
    fn on_timer(&mut self, event: TimerEvent) {
        self.countdown.on_timer(event);
    }

    fn apply_probe(&mut self, result: ProbeResult<i64>) {
        let succeeded = result.is_ok();
        self.probe.finish(result);
        if succeeded {
            self.countdown
                .clock()
                .set_offset(self.probe.offset_millis());
            self.countdown.resync();
        }
    }

    fn finished(&self) -> bool {
        match self.countdown.phase() {
            Phase::Counting | Phase::ArmedForFire => false,
            Phase::Fired => !self.countdown.trigger().is_playing(),
            Phase::Idle | Phase::Cancelled => true,
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let target_arg = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if target_arg.trim().is_empty() {
        anyhow::bail!("Usage: timed-playback <HH:MM | HH:MM:SS | YYYY-MM-DD HH:MM:SS>");
    }

    let config = Config::load().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded: {:?}", config);

    let target = parse_target(&target_arg, Local::now())?;
    tracing::info!(target = %target, "Playback target parsed");

    let mut event_loop: EventLoop<'static, App> =
        EventLoop::try_new().context("Failed to create event loop")?;
    let handle = event_loop.handle();

    let player = AudioPlayer::new().context("Failed to open audio output")?;
    let trigger = AudioTrigger::new(player, &config.sound);
    let timers = LoopTimers::new(handle.clone(), App::on_timer);

    let mut countdown = ScheduledCountdown::new(
        OffsetClock::new(SystemClock),
        timers,
        trigger,
        config.schedule.settings(),
    );
    countdown.subscribe(|update| match update.phase {
        Phase::Counting | Phase::ArmedForFire => {
            if let Some(display) = update.display() {
                println!("Start in {}", display);
            }
        }
        Phase::Fired => println!("Playing"),
        Phase::Cancelled => println!("Cancelled"),
        Phase::Idle => {}
    });

    let mut app = App {
        countdown,
        probe: TimeOffsetProbe::new(),
        signal: event_loop.get_signal(),
    };

    if config.time_sync.enabled {
        let service = OffsetService::new();
        service.start_probe(
            config.time_sync.url.clone(),
            Duration::from_secs(config.time_sync.timeout_secs),
        );
        app.probe.begin();

        handle
            .insert_source(service.channel, |event, _, app: &mut App| {
                if let ChannelEvent::Msg(result) = event {
                    app.apply_probe(result);
                }
            })
            .map_err(|e| anyhow::anyhow!("Failed to insert offset channel: {:?}", e))?;
    }

    match app.countdown.start(target.timestamp_millis()) {
        Ok(session) => tracing::info!(session = %session, "Waiting for target"),
        Err(CountdownError::PastTarget { .. }) => {
            tracing::info!("Target time already passed, nothing to play");
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to start countdown"),
    }

    // Signal handling for graceful shutdown
    let signals = Signals::new(&[Signal::SIGINT, Signal::SIGTERM])
        .context("Failed to create signal handler for graceful shutdown")?;
    handle
        .insert_source(signals, |_signal, _metadata, app: &mut App| {
            tracing::info!("Received shutdown signal, cancelling countdown");
            app.countdown.cancel();
            app.countdown.trigger_mut().stop();
            app.signal.stop();
        })
        .map_err(|e| anyhow::anyhow!("Failed to insert signal handler: {:?}", e))?;

    tracing::info!("Event loop starting");

    event_loop
        .run(Duration::from_millis(100), &mut app, |app| {
            if app.finished() {
                app.signal.stop();
            }
        })
        .context("Event loop dispatch error")?;

    app.countdown.metrics().log_summary();
    tracing::info!("Exiting");
    Ok(())
}

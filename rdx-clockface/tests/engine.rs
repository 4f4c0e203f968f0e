use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use clockface::components::audio::{AudioCues, RecordingPlayer};
use clockface::prelude::*;
use clockface::scheduler::{ManualScheduler, Scheduler};
use clockface::time::ManualWallClock;
use clockface::timezone::{StaticResolver, TimezoneResolver, TzDatabase};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

struct Harness {
    engine: ClockfaceEngine,
    scheduler: ManualScheduler,
    wall_clock: Arc<ManualWallClock>,
    player: Arc<RecordingPlayer>,
}

impl Harness {
    fn new(resolver: Arc<dyn TimezoneResolver>) -> Self {
        let scheduler = ManualScheduler::new();
        let wall_clock = Arc::new(ManualWallClock::new(
            Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap(),
        ));
        let player = Arc::new(RecordingPlayer::new());
        let capabilities = Capabilities {
            wall_clock: wall_clock.clone(),
            scheduler: Arc::new(scheduler.clone()),
            resolver,
            player: player.clone(),
            cues: Arc::new(AudioCues::unloaded(10)),
        };
        let engine = ClockfaceEngine::new(ClockfaceConfig::default(), capabilities);
        engine.install();
        Self {
            engine,
            scheduler,
            wall_clock,
            player,
        }
    }

    /// Advances the wall clock one second and delivers one scheduler tick, `n` times.
    async fn tick(&self, n: usize) {
        for _ in 0..n {
            self.wall_clock.advance(ChronoDuration::seconds(1));
            self.scheduler.fire().await;
        }
    }
}

fn drain<T: Clone>(rx: &mut broadcast::Receiver<T>) -> Vec<T> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn ten_second_countdown_fires_every_cue_then_expires() {
    let harness = Harness::new(Arc::new(TzDatabase));
    let mut events = harness.engine.subscribe_countdown_events();

    harness.engine.start_countdown(10).await.unwrap();
    harness.tick(10).await;

    let snapshot = harness.engine.countdown_snapshot().await;
    assert_eq!(snapshot.phase, CountdownPhase::Expired);
    assert_eq!(snapshot.state.remaining_seconds, 0);
    assert!(!snapshot.state.running);
    assert_eq!(snapshot.progress, 1.0);

    let expected: Vec<u32> = (1..=10).rev().collect();
    assert_eq!(harness.player.played(), expected);

    let events = drain(&mut events);
    assert_eq!(events.first(), Some(&CountdownEvent::Started { seconds: 10 }));
    let cues: Vec<u32> = events
        .iter()
        .filter_map(|event| match event {
            CountdownEvent::CueFired { threshold } => Some(*threshold),
            _ => None,
        })
        .collect();
    assert_eq!(cues, expected);
    let imminent: Vec<u32> = events
        .iter()
        .filter_map(|event| match event {
            CountdownEvent::Imminent { remaining_seconds } => Some(*remaining_seconds),
            _ => None,
        })
        .collect();
    assert_eq!(imminent, vec![3, 2, 1]);
    assert_eq!(events.last(), Some(&CountdownEvent::Expired));

    // Further ticks leave an expired countdown alone.
    harness.tick(3).await;
    assert_eq!(harness.player.played().len(), 10);
    assert_eq!(
        harness.engine.countdown_snapshot().await.state.remaining_seconds,
        0
    );
}

#[tokio::test]
async fn timezone_switch_mid_run_only_changes_the_display() {
    let harness = Harness::new(Arc::new(TzDatabase));
    harness.engine.start_countdown(30).await.unwrap();
    harness.tick(5).await;

    let before = harness.engine.countdown_snapshot().await;
    assert_eq!(before.state.remaining_seconds, 25);
    assert_eq!(harness.engine.display().await.unwrap().digital(), "12:00:05");

    harness
        .engine
        .set_timezone(TimezoneId::new("Asia/Tokyo"))
        .await;
    assert_eq!(harness.engine.countdown_snapshot().await, before);
    // Nothing is re-rendered until the next tick.
    assert!(harness.engine.display().await.unwrap().timezone.is_utc());

    harness.tick(1).await;
    let display = harness.engine.display().await.unwrap();
    assert_eq!(display.timezone.as_str(), "Asia/Tokyo");
    assert_eq!(display.digital(), "21:00:06");
    assert_eq!(
        harness.engine.countdown_snapshot().await.state.remaining_seconds,
        24
    );
}

#[tokio::test]
async fn unknown_timezone_degrades_to_utc_without_stopping() {
    let harness = Harness::new(Arc::new(StaticResolver::new()));
    let mut clock_events = harness.engine.subscribe_clock_events();
    harness
        .engine
        .set_timezone(TimezoneId::new("Atlantis/Capital"))
        .await;
    harness.engine.start_countdown(3).await.unwrap();

    harness.tick(3).await;

    let display = harness.engine.display().await.unwrap();
    assert!(display.timezone.is_utc());
    assert_eq!(display.digital(), "12:00:03");
    assert_eq!(
        harness.engine.countdown_snapshot().await.phase,
        CountdownPhase::Expired
    );

    let fallbacks = drain(&mut clock_events)
        .into_iter()
        .filter(|event| matches!(event, ClockEvent::TimezoneFallback(_)))
        .count();
    assert_eq!(fallbacks, 3);
}

#[tokio::test]
async fn clock_resamples_wall_time_after_a_stall() {
    let harness = Harness::new(Arc::new(TzDatabase));
    harness.engine.start_countdown(60).await.unwrap();
    harness.tick(1).await;

    // The scheduler stalls for 40 seconds and then delivers a single tick.
    harness.wall_clock.advance(ChronoDuration::seconds(40));
    harness.tick(1).await;

    assert_eq!(harness.engine.display().await.unwrap().digital(), "12:00:42");
    let angles = harness.engine.hand_angles().await.unwrap();
    assert_eq!(angles.second, 42.0 * 6.0 - 90.0);
    // The countdown is tick-counted: the stall only delays it.
    assert_eq!(
        harness.engine.countdown_snapshot().await.state.remaining_seconds,
        58
    );
}

#[tokio::test]
async fn reinstalling_never_leaves_two_registrations() {
    let harness = Harness::new(Arc::new(TzDatabase));
    let mut ticks = harness.engine.subscribe_tick_events();
    assert_eq!(harness.scheduler.active_registrations(), 1);

    harness.engine.install();
    harness.engine.install();
    assert_eq!(harness.scheduler.active_registrations(), 1);

    harness.tick(1).await;
    let delivered = drain(&mut ticks);
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].tick_count, 1);

    harness.engine.set_tick_period(Duration::from_millis(500));
    assert_eq!(harness.scheduler.periods(), vec![Duration::from_millis(500)]);
    assert_eq!(harness.engine.tick_period(), Duration::from_millis(500));
}

#[tokio::test]
async fn shutdown_deregisters_exactly_once() {
    let harness = Harness::new(Arc::new(TzDatabase));
    let mut system = harness.engine.subscribe_system_events();

    assert!(harness.engine.shutdown());
    assert!(!harness.engine.shutdown());
    assert!(!harness.engine.is_installed());
    assert_eq!(harness.scheduler.active_registrations(), 0);
    assert_eq!(harness.scheduler.fire().await, 0);

    let cancelled = drain(&mut system)
        .into_iter()
        .filter(|event| matches!(event, SystemEvent::TickCancelled { .. }))
        .count();
    assert_eq!(cancelled, 1);

    // A period change while uninstalled does not install anything.
    harness.engine.set_tick_period(Duration::from_secs(2));
    assert_eq!(harness.scheduler.active_registrations(), 0);
}

#[tokio::test]
async fn rejected_start_changes_nothing() {
    let harness = Harness::new(Arc::new(TzDatabase));
    let mut events = harness.engine.subscribe_countdown_events();

    assert_eq!(
        harness.engine.start_countdown(0).await,
        Err(CountdownError::InvalidDuration)
    );
    let snapshot = harness.engine.countdown_snapshot().await;
    assert_eq!(snapshot.phase, CountdownPhase::Idle);
    assert_eq!(snapshot.state, CountdownState::default());
    assert!(drain(&mut events).is_empty());
}

#[tokio::test]
async fn pause_resume_and_reset_are_reported() {
    let harness = Harness::new(Arc::new(TzDatabase));
    let mut events = harness.engine.subscribe_countdown_events();

    assert_eq!(harness.engine.start_preset(2).await, Ok(10));
    harness.tick(2).await;
    assert_eq!(harness.engine.toggle_countdown().await, CountdownPhase::Paused);
    harness.tick(5).await;
    assert_eq!(
        harness.engine.countdown_snapshot().await.state.remaining_seconds,
        8
    );
    assert_eq!(harness.engine.toggle_countdown().await, CountdownPhase::Running);
    assert_eq!(harness.engine.reset_countdown().await, CountdownPhase::Ready);

    let snapshot = harness.engine.countdown_snapshot().await;
    assert_eq!(snapshot.state.remaining_seconds, 10);
    assert!(!snapshot.state.running);

    let lifecycle: Vec<CountdownEvent> = drain(&mut events)
        .into_iter()
        .filter(|event| {
            !matches!(
                event,
                CountdownEvent::Ticked { .. } | CountdownEvent::CueFired { .. }
            )
        })
        .collect();
    assert_eq!(
        lifecycle,
        vec![
            CountdownEvent::Started { seconds: 10 },
            CountdownEvent::Paused { remaining_seconds: 8 },
            CountdownEvent::Resumed { remaining_seconds: 8 },
            CountdownEvent::Reset { remaining_seconds: 10 },
        ]
    );
}

#[tokio::test]
async fn dropping_the_last_handle_deregisters_the_tick() {
    let Harness {
        engine,
        scheduler,
        player,
        ..
    } = Harness::new(Arc::new(TzDatabase));
    let observer = engine.clone();
    engine.start_countdown(3).await.unwrap();
    assert_eq!(scheduler.active_registrations(), 1);

    // A surviving clone keeps the engine ticking.
    drop(engine);
    assert_eq!(scheduler.active_registrations(), 1);
    assert_eq!(scheduler.fire().await, 1);
    assert_eq!(player.played(), vec![3]);

    drop(observer);
    assert_eq!(scheduler.active_registrations(), 0);
    assert_eq!(scheduler.fire().await, 0);
    assert_eq!(player.played(), vec![3]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn clock_subscribers_read_the_tick_they_were_told_about() {
    let harness = Harness::new(Arc::new(TzDatabase));
    let mut clock_events = harness.engine.subscribe_clock_events();
    let (ack_tx, mut ack_rx) = tokio::sync::mpsc::channel(1);

    let reader = harness.engine.clone();
    let listener = tokio::spawn(async move {
        let mut checked = 0;
        while checked < 5 {
            if let Ok(ClockEvent::Updated { display, .. }) = clock_events.recv().await {
                assert_eq!(reader.display().await, Some(display));
                checked += 1;
                ack_tx.send(()).await.unwrap();
            }
        }
    });

    for _ in 0..5 {
        harness.tick(1).await;
        ack_rx.recv().await.unwrap();
    }
    listener.await.unwrap();
}

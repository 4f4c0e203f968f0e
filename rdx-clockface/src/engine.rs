//! The core engine that orchestrates the clock and the countdown.

use crate::common::{lock, RegistrationId, TimezoneId};
use crate::components::audio::{player_for, AudioCues, AudioPlayer};
use crate::components::clock::{ClockEngine, DisplayTime, HandAngles, Observation};
use crate::components::countdown::{CountdownEngine, CountdownPhase, CountdownSnapshot};
use crate::config::ClockfaceConfig;
use crate::error::CountdownError;
use crate::events::{ClockEvent, CountdownEvent, SystemEvent};
use crate::scheduler::{ScheduleHandle, Scheduler, TickCallback, TickFuture, TokioScheduler};
use crate::time::{SystemWallClock, TickEvent, WallClock};
use crate::timezone::{TimezoneResolver, TzDatabase};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, trace};

/// The host capabilities the engine runs on.
#[derive(Clone)]
pub struct Capabilities {
    pub wall_clock: Arc<dyn WallClock>,
    pub scheduler: Arc<dyn Scheduler>,
    pub resolver: Arc<dyn TimezoneResolver>,
    pub player: Arc<dyn AudioPlayer>,
    pub cues: Arc<AudioCues>,
}

impl Capabilities {
    /// The real clock, a Tokio scheduler, the IANA database, the configured
    /// audio backend, and cues loaded from the configured directory.
    pub fn system(config: &ClockfaceConfig) -> Self {
        Self {
            wall_clock: Arc::new(SystemWallClock),
            scheduler: Arc::new(TokioScheduler::new()),
            resolver: Arc::new(TzDatabase),
            player: player_for(config.audio.backend),
            cues: Arc::new(AudioCues::load(
                &config.countdown.cue_dir,
                config.countdown.cue_window,
            )),
        }
    }
}

/// The main Clockface engine.
///
/// This struct is the central point of control. It owns one clock and one
/// countdown, keeps exactly one periodic tick registration alive while
/// installed, and broadcasts what each tick produced. The engine is designed
/// to be cloned and shared across tasks; every clone is a handle to the same
/// instance. Dropping the last handle deregisters the tick.
#[derive(Clone)]
pub struct ClockfaceEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: ClockfaceConfig,
    wall_clock: Arc<dyn WallClock>,
    scheduler: Arc<dyn Scheduler>,
    clock: RwLock<ClockEngine>,
    countdown: RwLock<CountdownEngine>,
    latest: RwLock<Option<Observation>>,
    tick_count: AtomicU64,
    period: Mutex<Duration>,
    registration: Mutex<Option<ScheduleHandle>>,

    // --- Senders for each public event category ---
    tick_sender: broadcast::Sender<Arc<TickEvent>>,
    system_event_sender: broadcast::Sender<SystemEvent>,
    clock_event_sender: broadcast::Sender<ClockEvent>,
    countdown_event_sender: broadcast::Sender<CountdownEvent>,
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        let registration = self
            .registration
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut handle) = registration {
            if handle.cancel() {
                debug!("Engine dropped; tick registration {:?} removed.", handle.id());
            }
        }
    }
}

// Core implementation block for internal logic.
impl ClockfaceEngine {
    /// Creates a new `ClockfaceEngine` from a configuration and explicit capabilities.
    pub fn new(config: ClockfaceConfig, capabilities: Capabilities) -> Self {
        const CHANNEL_CAPACITY: usize = 256;
        let (tick_sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (clock_event_sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (countdown_event_sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (system_event_sender, _) = broadcast::channel(64);

        let clock = ClockEngine::new(capabilities.resolver, config.timezone.clone());
        let countdown =
            CountdownEngine::new(capabilities.cues, capabilities.player, &config.countdown);
        let period = config.resolution.period();

        Self {
            inner: Arc::new(EngineInner {
                config,
                wall_clock: capabilities.wall_clock,
                scheduler: capabilities.scheduler,
                clock: RwLock::new(clock),
                countdown: RwLock::new(countdown),
                latest: RwLock::new(None),
                tick_count: AtomicU64::new(0),
                period: Mutex::new(period),
                registration: Mutex::new(None),
                tick_sender,
                system_event_sender,
                clock_event_sender,
                countdown_event_sender,
            }),
        }
    }

    /// Creates an engine on the host's real capabilities.
    pub fn system(config: ClockfaceConfig) -> Self {
        let capabilities = Capabilities::system(&config);
        Self::new(config, capabilities)
    }

    /// Runs the engine until a shutdown signal is received.
    ///
    /// This method will:
    /// 1. Install the periodic tick registration.
    /// 2. Wait for a Ctrl+C signal.
    /// 3. Tear the registration down.
    pub async fn run(&self) -> anyhow::Result<()> {
        info!("ClockfaceEngine starting up...");
        self.install();
        self.inner.system_event_sender
            .send(SystemEvent::EngineStarted {
                timestamp: tokio::time::Instant::now(),
            })
            .ok();

        info!(
            "Engine ticking every {:?}. Press Ctrl+C to shut down.",
            self.tick_period()
        );
        tokio::signal::ctrl_c().await?;

        info!("Shutdown signal received.");
        self.shutdown();
        info!("ClockfaceEngine has shut down.");
        Ok(())
    }

    /// Samples the wall clock and drives both engines through one tick.
    ///
    /// The installed registration calls this; tests and tools can call it
    /// directly to step the engine.
    pub async fn handle_tick(&self) {
        let sample = self.inner.wall_clock.now();
        let tick_count = self.inner.tick_count.fetch_add(1, Ordering::SeqCst) + 1;
        trace!("Tick #{} at {}.", tick_count, sample);

        let observation = self.inner.clock.write().await.observe(sample);
        let warning = observation.warning.clone();
        let updated = ClockEvent::Updated {
            display: observation.display.clone(),
            angles: observation.angles,
        };
        *self.inner.latest.write().await = Some(observation);
        if let Some(warning) = warning {
            self.inner.clock_event_sender
                .send(ClockEvent::TimezoneFallback(warning))
                .ok();
        }
        self.inner.clock_event_sender.send(updated).ok();

        let (outcome, progress) = {
            let mut countdown = self.inner.countdown.write().await;
            let outcome = countdown.tick();
            (outcome, countdown.progress_ratio())
        };
        if outcome.consumed {
            if let Some(threshold) = outcome.cue {
                self.send_countdown(CountdownEvent::CueFired { threshold });
            }
            self.send_countdown(CountdownEvent::Ticked {
                remaining_seconds: outcome.remaining_seconds,
                progress,
            });
            if outcome.imminent {
                self.send_countdown(CountdownEvent::Imminent {
                    remaining_seconds: outcome.remaining_seconds,
                });
            }
            if outcome.expired {
                self.send_countdown(CountdownEvent::Expired);
            }
        }

        self.inner.tick_sender
            .send(Arc::new(TickEvent {
                tick_count,
                timestamp: sample,
            }))
            .ok();
    }

    #[doc(hidden)]
    fn send_countdown(&self, event: CountdownEvent) {
        self.inner.countdown_event_sender.send(event).ok();
    }
}

// Tick registration.
impl ClockfaceEngine {
    /// Installs the periodic tick, first tearing down any registration this
    /// engine already holds. At most one registration is ever active.
    pub fn install(&self) -> RegistrationId {
        let mut registration = lock(&self.inner.registration);
        if let Some(mut previous) = registration.take() {
            if previous.cancel() {
                self.inner.system_event_sender
                    .send(SystemEvent::TickCancelled { id: previous.id() })
                    .ok();
            }
        }

        let period = self.tick_period();
        // The registration must not keep the engine alive.
        let inner = Arc::downgrade(&self.inner);
        let callback: TickCallback = Box::new(move || -> TickFuture {
            let inner = inner.clone();
            Box::pin(async move {
                if let Some(inner) = inner.upgrade() {
                    ClockfaceEngine { inner }.handle_tick().await;
                }
            })
        });
        let handle = self.inner.scheduler.schedule(period, callback);
        let id = handle.id();
        *registration = Some(handle);

        debug!("Tick registration {:?} installed.", id);
        self.inner.system_event_sender
            .send(SystemEvent::TickInstalled { id, period })
            .ok();
        id
    }

    /// Removes the tick registration. Returns `true` if one was active; calling
    /// it again is a no-op.
    pub fn shutdown(&self) -> bool {
        let previous = lock(&self.inner.registration).take();
        match previous {
            Some(mut handle) => {
                if handle.cancel() {
                    self.inner.system_event_sender
                        .send(SystemEvent::TickCancelled { id: handle.id() })
                        .ok();
                }
                self.inner.system_event_sender
                    .send(SystemEvent::EngineShutdown)
                    .ok();
                true
            }
            None => false,
        }
    }

    pub fn is_installed(&self) -> bool {
        lock(&self.inner.registration).is_some()
    }

    pub fn tick_period(&self) -> Duration {
        *lock(&self.inner.period)
    }

    /// Changes the tick period. An installed registration is replaced by one
    /// with the new period.
    pub fn set_tick_period(&self, period: Duration) {
        *lock(&self.inner.period) = period;
        if self.is_installed() {
            self.install();
        }
    }
}

// Public API implementation block.
impl ClockfaceEngine {
    pub fn config(&self) -> &ClockfaceConfig {
        &self.inner.config
    }

    /// Switches the clock's timezone. The displayed time changes on the next
    /// tick; the countdown is untouched.
    pub async fn set_timezone(&self, timezone: TimezoneId) {
        self.inner.clock.write().await.set_timezone(timezone.clone());
        self.inner.clock_event_sender
            .send(ClockEvent::TimezoneChanged { timezone })
            .ok();
    }

    pub async fn timezone(&self) -> TimezoneId {
        self.inner.clock.read().await.timezone().clone()
    }

    /// The observation made on the most recent tick.
    pub async fn observation(&self) -> Option<Observation> {
        self.inner.latest.read().await.clone()
    }

    pub async fn display(&self) -> Option<DisplayTime> {
        self.inner.latest
            .read()
            .await
            .as_ref()
            .map(|observation| observation.display.clone())
    }

    pub async fn hand_angles(&self) -> Option<HandAngles> {
        self.inner.latest
            .read()
            .await
            .as_ref()
            .map(|observation| observation.angles)
    }

    /// Starts a countdown of `seconds`. A zero duration is rejected and changes nothing.
    pub async fn start_countdown(&self, seconds: u32) -> Result<(), CountdownError> {
        self.inner.countdown.write().await.start(seconds)?;
        self.send_countdown(CountdownEvent::Started { seconds });
        Ok(())
    }

    /// Starts the configured preset at `index`, returning its duration.
    pub async fn start_preset(&self, index: usize) -> Result<u32, CountdownError> {
        let seconds = self.inner.countdown.write().await.start_preset(index)?;
        self.send_countdown(CountdownEvent::Started { seconds });
        Ok(seconds)
    }

    /// Pauses or resumes the countdown.
    pub async fn toggle_countdown(&self) -> CountdownPhase {
        let (before, after, remaining_seconds) = {
            let mut countdown = self.inner.countdown.write().await;
            let before = countdown.phase();
            let after = countdown.toggle();
            (before, after, countdown.state().remaining_seconds)
        };
        match (before, after) {
            (CountdownPhase::Running, CountdownPhase::Paused) => {
                self.send_countdown(CountdownEvent::Paused { remaining_seconds })
            }
            (_, CountdownPhase::Running) if before != CountdownPhase::Running => {
                self.send_countdown(CountdownEvent::Resumed { remaining_seconds })
            }
            _ => {}
        }
        after
    }

    /// Rewinds the countdown to its initial duration without running it.
    pub async fn reset_countdown(&self) -> CountdownPhase {
        let (phase, remaining_seconds) = {
            let mut countdown = self.inner.countdown.write().await;
            let phase = countdown.reset();
            (phase, countdown.state().remaining_seconds)
        };
        if phase == CountdownPhase::Ready {
            self.send_countdown(CountdownEvent::Reset { remaining_seconds });
        }
        phase
    }

    pub async fn countdown_snapshot(&self) -> CountdownSnapshot {
        self.inner.countdown.read().await.snapshot()
    }

    pub async fn countdown_presets(&self) -> Vec<u32> {
        self.inner.countdown.read().await.presets().to_vec()
    }

    /// Subscribes to the raw tick stream. Each event is sent after the tick has
    /// updated the clock and countdown.
    pub fn subscribe_tick_events(&self) -> broadcast::Receiver<Arc<TickEvent>> {
        self.inner.tick_sender.subscribe()
    }

    /// Subscribes to the `SystemEvent` stream.
    pub fn subscribe_system_events(&self) -> broadcast::Receiver<SystemEvent> {
        self.inner.system_event_sender.subscribe()
    }

    /// Subscribes to the `ClockEvent` stream.
    pub fn subscribe_clock_events(&self) -> broadcast::Receiver<ClockEvent> {
        self.inner.clock_event_sender.subscribe()
    }

    /// Subscribes to the `CountdownEvent` stream.
    pub fn subscribe_countdown_events(&self) -> broadcast::Receiver<CountdownEvent> {
        self.inner.countdown_event_sender.subscribe()
    }
}

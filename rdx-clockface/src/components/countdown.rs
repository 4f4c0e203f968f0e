//! The countdown state machine: tick-counted, pausable, with audio cues over
//! its final seconds.

use crate::components::audio::{AudioCues, AudioPlayer};
use crate::config::CountdownConfig;
use crate::error::CountdownError;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a countdown is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownPhase {
    /// Nothing has been started yet.
    Idle,
    Running,
    /// Stopped mid-run by `toggle`; resumes from the frozen value.
    Paused,
    /// Rewound to the initial duration by `reset`; `toggle` runs it again.
    Ready,
    /// Reached zero. Only `start` or `reset` leave this phase.
    Expired,
}

/// The observable counters of a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CountdownState {
    pub remaining_seconds: u32,
    pub initial_seconds: u32,
    pub running: bool,
}

/// How close a running countdown is to the end, for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Calm,
    /// Inside the cue window.
    Warning,
    /// At or below the imminent threshold.
    Imminent,
}

/// What a single tick did to the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// `false` when the countdown was not running and the tick was ignored.
    pub consumed: bool,
    pub remaining_seconds: u32,
    /// The cue threshold fired on this tick.
    pub cue: Option<u32>,
    pub imminent: bool,
    pub expired: bool,
}

/// A point-in-time copy of everything a presentation layer shows.
#[derive(Debug, Clone, PartialEq)]
pub struct CountdownSnapshot {
    pub state: CountdownState,
    pub phase: CountdownPhase,
    pub progress: f64,
    pub urgency: Urgency,
    pub imminent: bool,
    /// `MM:SS`.
    pub formatted: String,
}

/// A single countdown timer.
pub struct CountdownEngine {
    state: CountdownState,
    phase: CountdownPhase,
    cues: Arc<AudioCues>,
    player: Arc<dyn AudioPlayer>,
    presets: Vec<u32>,
    warning_threshold: u32,
    imminent_threshold: u32,
    // Cue thresholds already fired during the current run.
    fired: BTreeSet<u32>,
}

impl CountdownEngine {
    pub fn new(cues: Arc<AudioCues>, player: Arc<dyn AudioPlayer>, config: &CountdownConfig) -> Self {
        Self {
            state: CountdownState::default(),
            phase: CountdownPhase::Idle,
            cues,
            player,
            presets: config.presets.clone(),
            warning_threshold: config.warning_threshold,
            imminent_threshold: config.imminent_threshold,
            fired: BTreeSet::new(),
        }
    }

    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn phase(&self) -> CountdownPhase {
        self.phase
    }

    pub fn snapshot(&self) -> CountdownSnapshot {
        CountdownSnapshot {
            state: self.state,
            phase: self.phase,
            progress: self.progress_ratio(),
            urgency: self.urgency(),
            imminent: self.is_imminent(),
            formatted: self.format_remaining(),
        }
    }

    pub fn presets(&self) -> &[u32] {
        &self.presets
    }

    /// Begins a new run of `seconds`, replacing whatever run was in progress.
    pub fn start(&mut self, seconds: u32) -> Result<(), CountdownError> {
        if seconds == 0 {
            debug!("Rejected countdown start with a zero duration.");
            return Err(CountdownError::InvalidDuration);
        }
        self.state = CountdownState {
            remaining_seconds: seconds,
            initial_seconds: seconds,
            running: true,
        };
        self.phase = CountdownPhase::Running;
        self.fired.clear();
        info!("Countdown started for {}s.", seconds);
        Ok(())
    }

    /// Starts the preset at `index` in the configured preset list.
    pub fn start_preset(&mut self, index: usize) -> Result<u32, CountdownError> {
        let seconds = self
            .presets
            .get(index)
            .copied()
            .ok_or(CountdownError::UnknownPreset {
                index,
                available: self.presets.len(),
            })?;
        self.start(seconds)?;
        Ok(seconds)
    }

    /// Pauses a running countdown, or resumes a paused or reset one. Does
    /// nothing when idle or expired. Returns the resulting phase.
    pub fn toggle(&mut self) -> CountdownPhase {
        match self.phase {
            CountdownPhase::Running => {
                self.phase = CountdownPhase::Paused;
                self.state.running = false;
                debug!("Countdown paused at {}s.", self.state.remaining_seconds);
            }
            CountdownPhase::Paused | CountdownPhase::Ready => {
                self.phase = CountdownPhase::Running;
                self.state.running = true;
                debug!("Countdown resumed at {}s.", self.state.remaining_seconds);
            }
            CountdownPhase::Idle | CountdownPhase::Expired => {
                debug!("Toggle ignored: no time remaining.");
            }
        }
        self.phase
    }

    /// Stops the countdown and rewinds it to its initial duration, ready to be
    /// toggled back on. The next run fires every cue again.
    pub fn reset(&mut self) -> CountdownPhase {
        if self.phase == CountdownPhase::Idle {
            return self.phase;
        }
        self.state.remaining_seconds = self.state.initial_seconds;
        self.state.running = false;
        self.phase = CountdownPhase::Ready;
        self.fired.clear();
        debug!("Countdown reset to {}s.", self.state.initial_seconds);
        self.phase
    }

    /// Consumes one tick. Only a running countdown changes.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != CountdownPhase::Running {
            return TickOutcome {
                consumed: false,
                remaining_seconds: self.state.remaining_seconds,
                cue: None,
                imminent: false,
                expired: false,
            };
        }

        let before = self.state.remaining_seconds;
        let cue = self.fire_cue(before);
        self.state.remaining_seconds = before.saturating_sub(1);

        let expired = self.state.remaining_seconds == 0;
        if expired {
            self.phase = CountdownPhase::Expired;
            self.state.running = false;
            info!("Countdown of {}s expired.", self.state.initial_seconds);
        }

        TickOutcome {
            consumed: true,
            remaining_seconds: self.state.remaining_seconds,
            cue,
            imminent: self.is_imminent(),
            expired,
        }
    }

    fn fire_cue(&mut self, threshold: u32) -> Option<u32> {
        if self.fired.contains(&threshold) {
            return None;
        }
        let handle = self.cues.get(threshold)?;
        self.fired.insert(threshold);
        if let Err(e) = self.player.play(handle) {
            warn!("Cue {} could not be played: {}", threshold, e);
        }
        Some(threshold)
    }

    /// Fraction of the run already elapsed, in `[0, 1]`.
    pub fn progress_ratio(&self) -> f64 {
        let CountdownState {
            remaining_seconds,
            initial_seconds,
            ..
        } = self.state;
        if initial_seconds == 0 {
            return 0.0;
        }
        f64::from(initial_seconds - remaining_seconds) / f64::from(initial_seconds)
    }

    pub fn is_imminent(&self) -> bool {
        self.state.running
            && self.state.remaining_seconds > 0
            && self.state.remaining_seconds <= self.imminent_threshold
    }

    pub fn urgency(&self) -> Urgency {
        if self.is_imminent() {
            Urgency::Imminent
        } else if self.state.running
            && self.state.remaining_seconds > 0
            && self.state.remaining_seconds <= self.warning_threshold
        {
            Urgency::Warning
        } else {
            Urgency::Calm
        }
    }

    /// Remaining time as `MM:SS`.
    pub fn format_remaining(&self) -> String {
        format_seconds(self.state.remaining_seconds)
    }
}

/// Formats a second count as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_seconds(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

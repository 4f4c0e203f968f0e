//! Defines all public event types broadcast by the Clockface engine.
//!
//! Presentation layers subscribe to these streams and re-read whatever derived
//! state they render. Events are sent after the tick has updated the engine, so
//! a subscriber that reacts to an event always sees the state it describes.

use crate::common::{RegistrationId, TimezoneId};
use crate::components::clock::{ClockWarning, DisplayTime, HandAngles};
use std::time::Duration;
use tokio::time::Instant;

/// Events related to the lifecycle of the engine and its tick registration.
#[derive(Debug, Clone)]
pub enum SystemEvent {
    /// Fired once when the engine's `run` loop begins.
    EngineStarted { timestamp: Instant },
    /// Fired when the engine stops ticking.
    EngineShutdown,
    /// A periodic tick registration was installed.
    TickInstalled { id: RegistrationId, period: Duration },
    /// A periodic tick registration was torn down.
    TickCancelled { id: RegistrationId },
}

/// Output of the clock on each tick and on reconfiguration.
#[derive(Debug, Clone)]
pub enum ClockEvent {
    /// A fresh projection of the current sample.
    Updated {
        display: DisplayTime,
        angles: HandAngles,
    },
    /// The target timezone was switched. The next `Updated` uses it.
    TimezoneChanged { timezone: TimezoneId },
    /// The target timezone could not be resolved on this tick.
    TimezoneFallback(ClockWarning),
}

/// Output of the countdown.
#[derive(Debug, Clone, PartialEq)]
pub enum CountdownEvent {
    Started { seconds: u32 },
    Paused { remaining_seconds: u32 },
    Resumed { remaining_seconds: u32 },
    Reset { remaining_seconds: u32 },
    /// A running countdown consumed a tick.
    Ticked { remaining_seconds: u32, progress: f64 },
    /// The cue for `threshold` was sent to the audio player.
    CueFired { threshold: u32 },
    /// The countdown is running inside its final seconds.
    Imminent { remaining_seconds: u32 },
    Expired,
}

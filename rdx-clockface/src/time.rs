//! Wall-clock sources and the tick event that carries a sample through the engine.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::{PoisonError, RwLock};

/// An absolute, timezone-independent instant captured from a `WallClock`.
pub type WallClockSample = DateTime<Utc>;

/// A source of absolute wall-clock time.
///
/// The engine resamples this on every tick instead of counting ticks, so a
/// stalled scheduler never leaves the displayed time permanently behind.
pub trait WallClock: Send + Sync {
    fn now(&self) -> WallClockSample;
}

/// The host's real-time clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn now(&self) -> WallClockSample {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used by tests and simulations.
#[derive(Debug)]
pub struct ManualWallClock {
    current: RwLock<WallClockSample>,
}

impl ManualWallClock {
    pub fn new(start: WallClockSample) -> Self {
        Self {
            current: RwLock::new(start),
        }
    }

    pub fn set(&self, instant: WallClockSample) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = instant;
    }

    pub fn advance(&self, by: ChronoDuration) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = *current + by;
    }
}

impl WallClock for ManualWallClock {
    fn now(&self) -> WallClockSample {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One invocation of the periodic scheduler, as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickEvent {
    /// Number of ticks handled since the engine was created, starting at 1.
    pub tick_count: u64,
    /// The wall-clock sample taken for this tick.
    pub timestamp: WallClockSample,
}

//! Projects wall-clock samples into a timezone and derives the digital and
//! analog readouts.

use crate::common::TimezoneId;
use crate::error::ResolveError;
use crate::time::WallClockSample;
use crate::timezone::{utc_offset, TimezoneResolver};
use chrono::{DateTime, FixedOffset, Timelike};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// The time of one sample as shown in one timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayTime {
    /// Two-digit, 24-hour form.
    pub hours: String,
    pub minutes: String,
    pub seconds: String,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// e.g. `"Monday, January 5, 2026"`.
    pub date_label: String,
    /// The timezone actually used for the projection (UTC after a fallback).
    pub timezone: TimezoneId,
    pub offset: FixedOffset,
}

impl DisplayTime {
    pub fn from_local(local: DateTime<FixedOffset>, timezone: TimezoneId) -> Self {
        let (hour, minute, second) = (local.hour(), local.minute(), local.second());
        Self {
            hours: format!("{:02}", hour),
            minutes: format!("{:02}", minute),
            seconds: format!("{:02}", second),
            hour,
            minute,
            second,
            date_label: local.format("%A, %B %-d, %Y").to_string(),
            timezone,
            offset: *local.offset(),
        }
    }

    /// `HH:MM:SS`.
    pub fn digital(&self) -> String {
        format!("{}:{}:{}", self.hours, self.minutes, self.seconds)
    }
}

/// Analog hand positions in degrees.
///
/// Zero points at 3 o'clock and angles grow clockwise in screen coordinates, so
/// 12 o'clock is -90. Values are not normalized into `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandAngles {
    pub hour: f64,
    pub minute: f64,
    pub second: f64,
}

impl HandAngles {
    pub fn radians(&self) -> (f64, f64, f64) {
        (
            self.hour.to_radians(),
            self.minute.to_radians(),
            self.second.to_radians(),
        )
    }
}

impl From<&DisplayTime> for HandAngles {
    fn from(display: &DisplayTime) -> Self {
        compute_hand_angles(display)
    }
}

pub fn compute_hand_angles(display: &DisplayTime) -> HandAngles {
    let hours = f64::from(display.hour % 12);
    let minutes = f64::from(display.minute);
    let seconds = f64::from(display.second);
    HandAngles {
        hour: hours * 30.0 + minutes * 0.5 - 90.0,
        minute: minutes * 6.0 + seconds * 0.1 - 90.0,
        second: seconds * 6.0 - 90.0,
    }
}

/// The end point of a hand of `length` drawn from `center` at `angle_degrees`,
/// in screen coordinates (y grows downwards).
pub fn hand_tip(angle_degrees: f64, center: (f64, f64), length: f64) -> (f64, f64) {
    let radians = angle_degrees.to_radians();
    (
        center.0 + radians.cos() * length,
        center.1 + radians.sin() * length,
    )
}

/// Placement of the three hands on a dial face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DialGeometry {
    pub center: (f64, f64),
    pub hour_length: f64,
    pub minute_length: f64,
    pub second_length: f64,
}

impl Default for DialGeometry {
    /// A 300x300 face.
    fn default() -> Self {
        Self {
            center: (150.0, 150.0),
            hour_length: 60.0,
            minute_length: 85.0,
            second_length: 100.0,
        }
    }
}

impl DialGeometry {
    /// Tip coordinates of the hour, minute and second hands.
    pub fn tips(&self, angles: &HandAngles) -> [(f64, f64); 3] {
        [
            hand_tip(angles.hour, self.center, self.hour_length),
            hand_tip(angles.minute, self.center, self.minute_length),
            hand_tip(angles.second, self.center, self.second_length),
        ]
    }
}

/// A non-fatal problem encountered while observing a sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockWarning {
    /// The configured timezone could not be resolved; UTC was shown instead.
    TimezoneFallback {
        requested: TimezoneId,
        error: ResolveError,
    },
}

impl fmt::Display for ClockWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockWarning::TimezoneFallback { requested, error } => {
                write!(f, "showing UTC instead of '{}': {}", requested, error)
            }
        }
    }
}

/// The result of observing one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub display: DisplayTime,
    pub angles: HandAngles,
    pub warning: Option<ClockWarning>,
}

/// Turns wall-clock samples into timezone-local display fields.
pub struct ClockEngine {
    resolver: Arc<dyn TimezoneResolver>,
    timezone: TimezoneId,
    // The timezone whose fallback has already been logged.
    warned_for: Option<TimezoneId>,
}

impl ClockEngine {
    pub fn new(resolver: Arc<dyn TimezoneResolver>, timezone: TimezoneId) -> Self {
        Self {
            resolver,
            timezone,
            warned_for: None,
        }
    }

    pub fn timezone(&self) -> &TimezoneId {
        &self.timezone
    }

    /// Switches the target timezone. The next observation uses it.
    pub fn set_timezone(&mut self, timezone: TimezoneId) {
        debug!("Clock timezone set to {}.", timezone);
        self.timezone = timezone;
    }

    /// Projects `sample` into the configured timezone, resolving the offset for
    /// this exact instant. An unknown timezone degrades to UTC.
    pub fn observe(&mut self, sample: WallClockSample) -> Observation {
        let (offset, used, warning) = match self.resolver.resolve(&self.timezone, sample) {
            Ok(offset) => (offset, self.timezone.clone(), None),
            Err(error) => {
                if self.warned_for.as_ref() != Some(&self.timezone) {
                    warn!("{}; falling back to UTC.", error);
                    self.warned_for = Some(self.timezone.clone());
                }
                let warning = ClockWarning::TimezoneFallback {
                    requested: self.timezone.clone(),
                    error,
                };
                (utc_offset(), TimezoneId::utc(), Some(warning))
            }
        };
        let display = DisplayTime::from_local(sample.with_timezone(&offset), used);
        Observation {
            angles: compute_hand_angles(&display),
            display,
            warning,
        }
    }
}

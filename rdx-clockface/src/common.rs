//! Contains common, primitive types shared across the Clockface engine.
//!
//! This module defines the identifier types used to name timezones and scheduler
//! registrations. Using distinct types keeps a timezone string from being confused
//! with any other piece of text flowing through the engine.

use serde::Deserialize;
use slotmap::new_key_type;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

new_key_type! {
    /// Uniquely and safely identifies an active periodic registration within a scheduler.
    ///
    /// A registration is created each time a tick callback is installed and is
    /// invalidated when its `ScheduleHandle` is cancelled. Keys are never reused,
    /// so a stale handle can never cancel a newer registration.
    pub struct RegistrationId;
}

/// Identifies a timezone by its IANA name (e.g. `"America/New_York"`) or `"UTC"`.
///
/// The identifier is opaque to the engines; only a `TimezoneResolver` knows how to
/// turn it into an offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct TimezoneId(String);

impl TimezoneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The UTC identifier every resolver must understand.
    pub fn utc() -> Self {
        Self("UTC".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_utc(&self) -> bool {
        self.0 == "UTC"
    }
}

impl Default for TimezoneId {
    fn default() -> Self {
        Self::utc()
    }
}

impl fmt::Display for TimezoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TimezoneId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TimezoneId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

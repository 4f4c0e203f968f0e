//! Error taxonomy for the engine.
//!
//! Configuration errors are returned to the caller and leave state untouched.
//! Resolution and audio errors never reach the caller of a tick: the engines log
//! them and continue in a degraded mode.

use crate::common::TimezoneId;
use std::path::PathBuf;
use thiserror::Error;

/// Rejected countdown operations. The countdown state is unchanged when one of
/// these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CountdownError {
    #[error("countdown duration must be a positive number of seconds")]
    InvalidDuration,
    #[error("no countdown preset at index {index} ({available} available)")]
    UnknownPreset { index: usize, available: usize },
}

/// Failure to turn a `TimezoneId` into an offset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(TimezoneId),
}

/// Failure to play an audio cue.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio output device unavailable: {0}")]
    Unavailable(String),
    #[error("failed to load cue {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("audio playback failed: {0}")]
    Playback(String),
}

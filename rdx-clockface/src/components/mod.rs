//! Contains the building blocks driven by each tick.
//!
//! The clock projects wall-clock time into a timezone, the countdown counts
//! ticks down to zero, and the audio module holds the cue table and the
//! playback primitive the countdown fires into. The `ClockfaceEngine` owns one
//! of each and drives them from a single scheduler registration.

pub mod audio;
pub mod clock;
pub mod countdown;

//! Defines all configuration structures for the Clockface engine.
//!
//! These structs are designed to be deserialized from a configuration file
//! (e.g., a TOML file) using `serde`, layered with `CLOCKFACE__*` environment
//! overrides by the `config` crate. Every section has a `Default`, so an empty
//! or missing file yields a working engine ticking once per second in UTC.

use crate::common::TimezoneId;
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The top-level configuration for the `ClockfaceEngine`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClockfaceConfig {
    /// The tick period of the scheduler driving both engines.
    #[serde(default)]
    pub resolution: ClockResolution,

    /// The timezone the clock projects into at startup.
    #[serde(default)]
    pub timezone: TimezoneId,

    #[serde(default)]
    pub countdown: CountdownConfig,

    #[serde(default)]
    pub audio: AudioConfig,
}

/// Defines the tick period of the scheduler.
///
/// The countdown is tick-counted, so anything other than `Standard` makes one
/// countdown "second" last one tick of the custom period.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockResolution {
    /// One tick per second.
    #[default]
    Standard,
    /// A user-defined period in milliseconds.
    Custom { period_ms: u64 },
}

impl ClockResolution {
    pub fn period(&self) -> Duration {
        match self {
            ClockResolution::Standard => Duration::from_secs(1),
            // A zero period would spin the scheduler.
            ClockResolution::Custom { period_ms } => Duration::from_millis((*period_ms).max(1)),
        }
    }
}

/// Settings for the countdown engine and its audio cues.
#[derive(Debug, Clone, Deserialize)]
pub struct CountdownConfig {
    /// Durations (in seconds) offered as one-press presets.
    #[serde(default = "default_presets")]
    pub presets: Vec<u32>,

    /// Directory holding `countdown-<n>.wav` cue files.
    #[serde(default = "default_cue_dir")]
    pub cue_dir: PathBuf,

    /// Highest remaining-seconds value that has a cue. Cues cover `1..=cue_window`,
    /// and `cue_window` must lie in `1..=MAX_CUE_WINDOW`.
    #[serde(default = "default_cue_window")]
    pub cue_window: u32,

    /// Remaining-seconds value at or below which a running countdown shows the
    /// warning urgency.
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: u32,

    /// Remaining-seconds value at or below which a running countdown is imminent.
    #[serde(default = "default_imminent_threshold")]
    pub imminent_threshold: u32,
}

/// Selects the audio playback primitive used for cues.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AudioConfig {
    #[serde(default)]
    pub backend: AudioBackend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioBackend {
    /// Cues are logged but not played.
    #[default]
    Silent,
    /// Cues ring the terminal bell.
    Bell,
    /// Cues are decoded and played through `rodio` (requires the `rodio-audio` feature).
    Rodio,
}

/// Cue files exist for at most the last ten seconds.
pub const MAX_CUE_WINDOW: u32 = 10;

impl ClockfaceConfig {
    /// Loads the configuration from an optional TOML file plus `CLOCKFACE__*`
    /// environment variables (e.g. `CLOCKFACE__TIMEZONE=Asia/Tokyo`).
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        } else {
            builder = builder.add_source(config::File::with_name("clockface").required(false));
        }
        let config: Self = builder
            .add_source(config::Environment::with_prefix("CLOCKFACE").separator("__"))
            .build()
            .context("failed to read clockface configuration")?
            .try_deserialize()
            .context("invalid clockface configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the countdown cannot honour.
    pub fn validate(&self) -> anyhow::Result<()> {
        let countdown = &self.countdown;
        anyhow::ensure!(
            (1..=MAX_CUE_WINDOW).contains(&countdown.cue_window),
            "countdown.cue_window must be between 1 and {}, got {}",
            MAX_CUE_WINDOW,
            countdown.cue_window
        );
        anyhow::ensure!(
            countdown.imminent_threshold <= countdown.warning_threshold,
            "countdown.imminent_threshold ({}) exceeds countdown.warning_threshold ({})",
            countdown.imminent_threshold,
            countdown.warning_threshold
        );
        Ok(())
    }
}

// --- Default value functions for serde ---

fn default_presets() -> Vec<u32> {
    vec![60, 30, 10]
}

fn default_cue_dir() -> PathBuf {
    PathBuf::from("assets")
}

fn default_cue_window() -> u32 {
    10
}

fn default_warning_threshold() -> u32 {
    10
}

fn default_imminent_threshold() -> u32 {
    3
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            presets: default_presets(),
            cue_dir: default_cue_dir(),
            cue_window: default_cue_window(),
            warning_threshold: default_warning_threshold(),
            imminent_threshold: default_imminent_threshold(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> ClockfaceConfig {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse("");
        assert_eq!(config.resolution, ClockResolution::Standard);
        assert_eq!(config.resolution.period(), Duration::from_secs(1));
        assert!(config.timezone.is_utc());
        assert_eq!(config.countdown.presets, vec![60, 30, 10]);
        assert_eq!(config.countdown.cue_window, 10);
        assert_eq!(config.countdown.warning_threshold, 10);
        assert_eq!(config.countdown.imminent_threshold, 3);
        assert!(config.validate().is_ok());
        assert_eq!(config.audio.backend, AudioBackend::Silent);
    }

    #[test]
    fn reads_custom_sections() {
        let config = parse(
            r#"
            timezone = "Asia/Kolkata"

            [resolution.custom]
            period_ms = 250

            [countdown]
            presets = [5, 15]
            cue_dir = "sounds"

            [audio]
            backend = "bell"
            "#,
        );
        assert_eq!(config.timezone.as_str(), "Asia/Kolkata");
        assert_eq!(config.resolution.period(), Duration::from_millis(250));
        assert_eq!(config.countdown.presets, vec![5, 15]);
        assert_eq!(config.countdown.cue_dir, PathBuf::from("sounds"));
        assert_eq!(config.countdown.cue_window, 10);
        assert_eq!(config.audio.backend, AudioBackend::Bell);
    }

    #[test]
    fn cue_window_outside_the_cue_table_is_rejected() {
        let too_wide = parse("[countdown]\ncue_window = 30");
        let error = too_wide.validate().unwrap_err();
        assert!(error.to_string().contains("cue_window"));

        assert!(parse("[countdown]\ncue_window = 0").validate().is_err());
        assert!(parse("[countdown]\ncue_window = 5").validate().is_ok());
    }

    #[test]
    fn warning_band_is_independent_of_the_cue_window() {
        let config = parse("[countdown]\ncue_window = 5\nwarning_threshold = 20");
        assert_eq!(config.countdown.cue_window, 5);
        assert_eq!(config.countdown.warning_threshold, 20);
        assert!(config.validate().is_ok());

        let inverted = parse("[countdown]\nwarning_threshold = 2\nimminent_threshold = 3");
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn zero_custom_period_is_clamped() {
        let resolution = ClockResolution::Custom { period_ms: 0 };
        assert_eq!(resolution.period(), Duration::from_millis(1));
    }
}

//! # Clockface
//!
//! A tick-driven clock and countdown engine for Rust.
//!
//! Clockface provides the engine behind a clock widget: a timezone-aware time
//! display with digital and analog readouts, and a countdown timer that plays
//! audio cues over its final seconds. It is designed to be a library that a
//! presentation layer (a terminal UI, a GUI, a web front end) drives and reads.
//!
//! ## Core Concepts
//!
//! - **Single Tick**: One periodic scheduler registration drives everything.
//!   Each tick resamples the wall clock, projects it into the selected timezone,
//!   and advances a running countdown by exactly one second.
//! - **Injected Capabilities**: The wall clock, the scheduler, the timezone
//!   resolver and the audio player are traits. The defaults use `chrono`,
//!   `tokio` and `chrono-tz`; tests swap in manual doubles.
//! - **Event-Driven**: Each tick is broadcast as strongly-typed events
//!   (`TickEvent`, `ClockEvent`, `CountdownEvent`, `SystemEvent`). Subscribers
//!   re-read whatever state they render.
//! - **Configuration-Driven**: Tick period, starting timezone, countdown
//!   presets and the audio backend come from a `ClockfaceConfig`, usually loaded
//!   from a TOML file.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use clockface::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // 1. Create a default configuration: one tick per second, UTC.
//!     let config = ClockfaceConfig::default();
//!
//!     // 2. Create the engine on the host's clock, scheduler and timezone database.
//!     let engine = ClockfaceEngine::system(config);
//!
//!     // 3. Subscribe to an event stream before starting the engine.
//!     let mut countdown_events = engine.subscribe_countdown_events();
//!     tokio::spawn(async move {
//!         while let Ok(event) = countdown_events.recv().await {
//!             println!("Countdown: {:?}", event);
//!         }
//!     });
//!
//!     // 4. Configure the clock and start a countdown.
//!     engine.set_timezone(TimezoneId::new("Europe/Paris")).await;
//!     engine.start_countdown(30).await?;
//!
//!     // 5. Run the engine. It will shut down on Ctrl+C.
//!     engine.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "Clockface";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod common;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod time;
pub mod timezone;

/// A prelude module for easy importing of the most common Clockface types.
pub mod prelude {
    pub use crate::common::{RegistrationId, TimezoneId};
    pub use crate::components::clock::{DisplayTime, HandAngles};
    pub use crate::components::countdown::{CountdownPhase, CountdownSnapshot, CountdownState};
    pub use crate::config::{ClockResolution, ClockfaceConfig};
    pub use crate::engine::{Capabilities, ClockfaceEngine};
    pub use crate::error::CountdownError;
    pub use crate::events::{ClockEvent, CountdownEvent, SystemEvent};
    pub use crate::time::TickEvent;
}

use anyhow::Result;
use clap::Parser;
use clockface::components::countdown::{CountdownSnapshot, Urgency};
use clockface::prelude::*;
use clockface::timezone;
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Live terminal readout of the Clockface engine.
#[derive(Debug, Parser)]
#[command(name = "clockdev", version, about)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Timezone to display, overriding the configuration (e.g. "Asia/Tokyo").
    #[arg(short, long)]
    timezone: Option<String>,

    /// Start a countdown of this many seconds right away.
    #[arg(long)]
    countdown: Option<u32>,

    /// Print hand angles instead of digits.
    #[arg(long)]
    analog: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    // 2. Load the configuration and apply command-line overrides.
    let mut config = ClockfaceConfig::load(args.config.as_deref())?;
    if let Some(tz) = args.timezone {
        config.timezone = TimezoneId::new(tz);
    }

    // 3. Create the engine on the host's capabilities.
    let engine = ClockfaceEngine::system(config);

    // 4. Spawn concurrent tasks to render the event streams.
    spawn_event_listeners(&engine, args.analog);

    // 5. Kick off the requested countdown.
    if let Some(seconds) = args.countdown {
        engine.start_countdown(seconds).await?;
    }

    let entry = timezone::selector_entry(&engine.timezone().await);
    info!(
        "Showing {} ({}).",
        entry.display_name(),
        entry.formatted_offset()
    );

    // 6. Run the engine.
    engine.run().await?;

    Ok(())
}

/// Spawns the tasks that print each tick and log countdown and system events.
fn spawn_event_listeners(engine: &ClockfaceEngine, analog: bool) {
    let mut tick_rx = engine.subscribe_tick_events();
    let renderer = engine.clone();
    tokio::spawn(async move {
        while let Ok(tick) = tick_rx.recv().await {
            let Some(observation) = renderer.observation().await else {
                continue;
            };
            let face = if analog {
                let angles = observation.angles;
                format!(
                    "hour {:>7.1}°  minute {:>6.1}°  second {:>6.1}°",
                    angles.hour, angles.minute, angles.second
                )
            } else {
                observation.display.digital()
            };
            println!(
                "{} {}  {}  [{}]",
                format!("#{:<5}", tick.tick_count).dimmed(),
                face.cyan().bold(),
                observation.display.date_label,
                observation.display.timezone
            );
            let countdown = renderer.countdown_snapshot().await;
            if countdown.state.initial_seconds > 0 {
                println!("       {}", render_countdown(&countdown));
            }
        }
    });

    let mut countdown_rx = engine.subscribe_countdown_events();
    tokio::spawn(async move {
        while let Ok(event) = countdown_rx.recv().await {
            match event {
                CountdownEvent::Ticked { .. } => {}
                other => info!("[COUNTDOWN] => {:?}", other),
            }
        }
    });

    let mut system_rx = engine.subscribe_system_events();
    tokio::spawn(async move {
        while let Ok(event) = system_rx.recv().await {
            info!("[SYSTEM] => {:?}", event);
        }
    });
}

fn render_countdown(countdown: &CountdownSnapshot) -> String {
    const WIDTH: usize = 30;
    let filled = (countdown.progress * WIDTH as f64).round() as usize;
    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(WIDTH - filled.min(WIDTH)));
    let time = match countdown.urgency {
        Urgency::Imminent => format!("{} GET READY!", countdown.formatted).red().bold(),
        Urgency::Warning => countdown.formatted.yellow().bold(),
        Urgency::Calm => countdown.formatted.green(),
    };
    format!("{} {} {:>3.0}%", time, bar, countdown.progress * 100.0)
}

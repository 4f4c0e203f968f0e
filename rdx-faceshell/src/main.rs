use anyhow::Result;
use clockface::components::countdown::Urgency;
use clockface::prelude::*;
use clockface::timezone::{self, CATALOG};
use clockface::{ENGINE_NAME, VERSION as LIB_VERSION};
use colored::Colorize;
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct CommandHighlighter;

impl Highlighter for CommandHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            Cow::Owned(format!("{} {}", command.yellow().bold(), rest.yellow()))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

/// Shell-side display toggles shared with the listener tasks.
#[derive(Clone, Default)]
struct ViewFlags {
    watching_ticks: Arc<AtomicBool>,
    analog: Arc<AtomicBool>,
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    const LOGO_TEXT: &str = include_str!("../logo.log");
    println!("{}", LOGO_TEXT.cyan());

    let version_string = format!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    let rule = "-".repeat(79);
    println!("{}", rule.dimmed());
    println!("{}", version_string);
    println!(
        "{}",
        "    Distributed under the MIT OR Apache-2.0 license. Use at your own risk.".dimmed()
    );
    println!("{}", rule.dimmed());
}

/// Spawns the tasks that echo engine events into the shell.
fn spawn_event_listeners(engine: &ClockfaceEngine, flags: ViewFlags) {
    let mut countdown_rx = engine.subscribe_countdown_events();
    tokio::spawn(async move {
        while let Ok(event) = countdown_rx.recv().await {
            match event {
                CountdownEvent::CueFired { threshold } => {
                    println!("<-- [CUE] {}", threshold.to_string().yellow().bold())
                }
                CountdownEvent::Imminent { remaining_seconds } => {
                    println!("<-- [COUNTDOWN] {} GET READY!", remaining_seconds.to_string().red().bold())
                }
                CountdownEvent::Expired => println!("<-- [COUNTDOWN] {}", "Time's up!".red().bold()),
                _ => {}
            }
        }
    });

    let mut tick_rx = engine.subscribe_tick_events();
    let renderer = engine.clone();
    tokio::spawn(async move {
        while let Ok(tick) = tick_rx.recv().await {
            if !flags.watching_ticks.load(Ordering::Relaxed) {
                continue;
            }
            if let Some(line) = face_line(&renderer, flags.analog.load(Ordering::Relaxed)).await {
                println!("<-- [TICK #{}] {}", tick.tick_count, line);
            }
        }
    });
}

async fn face_line(engine: &ClockfaceEngine, analog: bool) -> Option<String> {
    let observation = engine.observation().await?;
    let face = if analog {
        let angles = observation.angles;
        format!(
            "hour {:.1}° minute {:.1}° second {:.1}°",
            angles.hour, angles.minute, angles.second
        )
    } else {
        observation.display.digital()
    };
    Some(format!(
        "{}  {}  [{}]",
        face.cyan().bold(),
        observation.display.date_label,
        observation.display.timezone
    ))
}

async fn print_status(engine: &ClockfaceEngine, analog: bool) {
    match face_line(engine, analog).await {
        Some(line) => println!("Clock:     {}", line),
        None => println!("Clock:     (waiting for the first tick)"),
    }
    let selected = engine.timezone().await;
    let entry = timezone::selector_entry(&selected);
    println!(
        "Timezone:  {} ({} {})",
        selected,
        entry.display_name(),
        entry.formatted_offset()
    );
    let countdown = engine.countdown_snapshot().await;
    let time = match countdown.urgency {
        Urgency::Imminent => countdown.formatted.red().bold(),
        Urgency::Warning => countdown.formatted.yellow().bold(),
        Urgency::Calm => countdown.formatted.normal(),
    };
    println!(
        "Countdown: {} {:?} ({:.0}% elapsed)",
        time,
        countdown.phase,
        countdown.progress * 100.0
    );
}

fn print_zones(selected: &TimezoneId) {
    for entry in CATALOG {
        let marker = if entry.id == selected.as_str() { "*" } else { " " };
        println!(
            " {} {:<22} {:<30} {} • {}",
            marker,
            entry.id,
            entry.display_name(),
            entry.offset_code(),
            entry.formatted_offset()
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ClockfaceConfig::load(None)?;
    let engine = ClockfaceEngine::system(config);
    let flags = ViewFlags::default();

    spawn_event_listeners(&engine, flags.clone());

    info!("Installing the {} tick...", ENGINE_NAME.cyan());
    engine.install();

    let mut rl = Editor::new()?;
    rl.set_helper(Some(CommandHighlighter));

    println!("{} is running. Type 'help' for commands or 'exit' to quit.", ENGINE_NAME.cyan());

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(_) => {
                println!("Exiting faceshell...");
                break;
            }
        };
        rl.add_history_entry(line.as_str())?;
        let args = line.split_whitespace().collect::<Vec<_>>();
        let Some(command) = args.first() else {
            continue;
        };

        match *command {
            "start" => match args.get(1).map(|s| s.parse::<u32>()) {
                Some(Ok(seconds)) => match engine.start_countdown(seconds).await {
                    Ok(()) => println!("--> Countdown started for {}s.", seconds),
                    Err(e) => println!("Error: {}", e),
                },
                Some(Err(_)) => println!("Error: '{}' is not a valid number of seconds.", args[1]),
                None => println!("Usage: start <SECONDS>"),
            },
            "preset" => match args.get(1).map(|s| s.parse::<usize>()) {
                Some(Ok(number)) if number > 0 => match engine.start_preset(number - 1).await {
                    Ok(seconds) => println!("--> Countdown started for {}s.", seconds),
                    Err(e) => println!("Error: {}", e),
                },
                _ => {
                    println!("Usage: preset <N>");
                    for (i, seconds) in engine.countdown_presets().await.iter().enumerate() {
                        println!("  {}: {} seconds", i + 1, seconds);
                    }
                }
            },
            "toggle" => {
                let phase = engine.toggle_countdown().await;
                println!("--> Countdown is {:?}.", phase);
            }
            "reset" => {
                let phase = engine.reset_countdown().await;
                println!("--> Countdown is {:?}.", phase);
            }
            "tz" => match args.get(1) {
                Some(id) => {
                    let id = TimezoneId::new(*id);
                    if timezone::find(&id).is_none() {
                        println!("Note: '{}' is not in the catalog; unknown ids show UTC.", id);
                    }
                    engine.set_timezone(id.clone()).await;
                    println!("--> Timezone set to {}. It applies from the next tick.", id);
                }
                None => println!("Usage: tz <TIMEZONE_ID>   (see 'zones')"),
            },
            "zones" => print_zones(&engine.timezone().await),
            "view" => {
                let analog = !flags.analog.fetch_xor(true, Ordering::Relaxed);
                println!("--> Showing the {} view.", if analog { "analog" } else { "digital" });
            }
            "status" => print_status(&engine, flags.analog.load(Ordering::Relaxed)).await,
            "watch" => match args.get(1) {
                Some(&"on") => {
                    flags.watching_ticks.store(true, Ordering::Relaxed);
                    println!("--> Printing every tick.");
                }
                Some(&"off") => {
                    flags.watching_ticks.store(false, Ordering::Relaxed);
                    println!("--> Stopped printing ticks.");
                }
                _ => println!("Usage: watch on|off"),
            },
            "help" => {
                println!("Available commands:");
                println!("  start <S>       - Starts an S-second countdown.");
                println!("  preset <N>      - Starts preset N (run without N to list presets).");
                println!("  toggle          - Pauses or resumes the countdown.");
                println!("  reset           - Rewinds the countdown to its starting duration.");
                println!("  tz <ID>         - Switches the clock's timezone.");
                println!("  zones           - Lists the timezone catalog.");
                println!("  view            - Switches between digital and analog readouts.");
                println!("  status          - Shows the clock and countdown.");
                println!("  watch on|off    - Prints every tick.");
                println!("  exit            - Quits the shell.");
            }
            "exit" => break,
            _ => println!("Unknown command: '{}'. Type 'help'.", line),
        }
    }

    engine.shutdown();
    Ok(())
}

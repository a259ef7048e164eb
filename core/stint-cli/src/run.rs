//! Running a timer in the terminal.
//!
//! The engine is driven by its ticker; the status line is drawn from a mirror
//! so rendering never contends with commands typed on stdin.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use stint_core::{
    format_duration, load_config, save_config, DisplayMode, HistoryEntry, ManualClock,
    MirrorPoller, RunState, StintApp, StorageConfig, TickOutcome, TimerMode,
};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Toggle,
    Stop,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "p" | "pause" | "resume" => Some(Command::Toggle),
        "s" | "stop" => Some(Command::Stop),
        "q" | "quit" => Some(Command::Quit),
        _ => None,
    }
}

pub fn stopwatch(storage: StorageConfig, simulate: Option<u64>) -> Result<(), String> {
    match simulate {
        Some(secs) => simulated(storage, TimerMode::Stopwatch, None, secs),
        None => live(storage, TimerMode::Stopwatch, None),
    }
}

pub fn countdown(
    storage: StorageConfig,
    target: (u32, u32, u32),
    simulate: Option<u64>,
) -> Result<(), String> {
    if target == (0, 0, 0) {
        return Err("countdown needs a target: pass --hours, --minutes or --seconds".to_string());
    }
    match simulate {
        Some(secs) => simulated(storage, TimerMode::Countdown, Some(target), secs),
        None => live(storage, TimerMode::Countdown, Some(target)),
    }
}

pub fn set_display(storage: StorageConfig, display_mode: DisplayMode) -> Result<(), String> {
    let mut config = load_config(&storage);
    config.display_mode = display_mode;
    save_config(&storage, &config)?;
    println!("Display format set to {:?}", display_mode);
    Ok(())
}

fn apply_target(app: &StintApp, target: Option<(u32, u32, u32)>) -> Result<(), String> {
    if let Some((hours, minutes, seconds)) = target {
        app.set_target(hours, minutes, seconds).map_err(|e| e.to_string())?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Live
// ─────────────────────────────────────────────────────────────────────────────

fn live(
    storage: StorageConfig,
    mode: TimerMode,
    target: Option<(u32, u32, u32)>,
) -> Result<(), String> {
    let app = StintApp::with_storage(storage).map_err(|e| e.to_string())?;
    apply_target(&app, target)?;

    let interval = app.config().mirror_interval();
    let mirror = app.mirror(mode);
    let _poller = MirrorPoller::spawn(mirror.clone(), interval)?;
    let mut commands = Some(spawn_stdin_reader());

    println!("p = pause/resume, s = stop and save, q = quit without saving");
    app.toggle_start_pause(mode);
    info!(mode = ?mode, "Timer started from terminal");

    let mut drawn = 0;
    loop {
        let snapshot = mirror.current();
        if snapshot.version != drawn {
            drawn = snapshot.version;
            draw_status(&mirror.display_time(), &mirror.start_button_label());
        }

        let command = match &commands {
            Some(rx) => match rx.recv_timeout(interval) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("stdin closed; timer keeps running");
                    commands = None;
                    None
                }
            },
            None => {
                thread::sleep(interval);
                None
            }
        };

        match command {
            Some(Command::Toggle) => {
                app.toggle_start_pause(mode);
            }
            Some(Command::Stop) => {
                let entry = app.stop(mode);
                app.flush();
                println!();
                print_outcome(entry.as_ref());
                return Ok(());
            }
            Some(Command::Quit) => {
                println!();
                if app.engine(mode).state() != RunState::Idle {
                    println!("Quit; current session discarded");
                }
                return Ok(());
            }
            None => {}
        }

        if mode == TimerMode::Countdown && app.engine(mode).state() == RunState::Idle {
            app.flush();
            println!();
            println!("Countdown finished");
            print_outcome(app.list_history().first());
            return Ok(());
        }
    }
}

fn draw_status(display_time: &str, button_label: &str) {
    let mut out = io::stdout().lock();
    let _ = write!(out, "\r{display_time}  [p: {button_label}]   ");
    let _ = out.flush();
}

fn spawn_stdin_reader() -> Receiver<Command> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            let Some(command) = parse_command(&line) else {
                eprintln!("\nunknown command {:?} (p, s, q)", line.trim());
                continue;
            };
            if tx.send(command).is_err() {
                break;
            }
        }
    });
    rx
}

// ─────────────────────────────────────────────────────────────────────────────
// Simulated
// ─────────────────────────────────────────────────────────────────────────────

fn simulated(
    storage: StorageConfig,
    mode: TimerMode,
    target: Option<(u32, u32, u32)>,
    secs: u64,
) -> Result<(), String> {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let app = StintApp::with_clock(storage, clock.clone(), false).map_err(|e| e.to_string())?;
    apply_target(&app, target)?;
    let engine = app.engine(mode);

    engine.toggle_start_pause();
    let mut expired = false;
    for _ in 0..secs {
        clock.advance(Duration::from_secs(1));
        let outcome = engine.tick_now();
        println!("{}", engine.display_time());
        if outcome == TickOutcome::Expired {
            expired = true;
            break;
        }
    }

    let entry = if expired {
        app.flush();
        println!("Countdown finished");
        app.list_history().into_iter().next()
    } else {
        let entry = app.stop(mode);
        app.flush();
        entry
    };
    print_outcome(entry.as_ref());
    Ok(())
}

fn print_outcome(entry: Option<&HistoryEntry>) {
    match entry {
        Some(entry) => println!(
            "Saved \"{}\" ({})",
            entry.name,
            format_duration(
                Duration::from_nanos(entry.duration_nanos),
                DisplayMode::HourMinSec
            )
        ),
        None => println!("No time elapsed; nothing saved"),
    }
}

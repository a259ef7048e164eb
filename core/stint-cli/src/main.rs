//! stint: terminal client for the Stint timers.
//!
//! ## Subcommands
//!
//! - `stopwatch`: Count up until stopped (`p` pause/resume, `s` stop and save, `q` quit)
//! - `countdown`: Count down from a target; saves itself on expiry
//! - `history`: List and edit completed sessions
//! - `display`: Set the default display format
//!
//! Both timer commands accept `--simulate <SECS>` to run on a virtual clock,
//! advancing one second per step without waiting.

mod history;
mod logging;
mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use stint_core::{DisplayMode, StorageConfig};

#[derive(Parser)]
#[command(name = "stint")]
#[command(about = "Stopwatch and countdown timer with session history")]
#[command(version)]
struct Cli {
    /// Data directory (default: $STINT_HOME or ~/.stint)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the stopwatch
    Stopwatch {
        /// Run on a virtual clock for this many seconds, then stop and save
        #[arg(long, value_name = "SECS")]
        simulate: Option<u64>,
    },

    /// Run a countdown
    Countdown {
        #[arg(long, default_value_t = 0)]
        hours: u32,

        #[arg(long, default_value_t = 0)]
        minutes: u32,

        #[arg(long, default_value_t = 0)]
        seconds: u32,

        /// Run on a virtual clock for at most this many seconds
        #[arg(long, value_name = "SECS")]
        simulate: Option<u64>,
    },

    /// Inspect and edit completed sessions
    History {
        #[command(subcommand)]
        command: history::HistoryCommand,
    },

    /// Set how times are shown
    Display {
        #[arg(value_enum)]
        mode: DisplayArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DisplayArg {
    /// HH:MM:SS
    Hms,
    /// MM:SS
    Ms,
    /// Seconds only
    S,
}

impl From<DisplayArg> for DisplayMode {
    fn from(arg: DisplayArg) -> Self {
        match arg {
            DisplayArg::Hms => DisplayMode::HourMinSec,
            DisplayArg::Ms => DisplayMode::MinSec,
            DisplayArg::S => DisplayMode::SecOnly,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let storage = match cli.data_dir {
        Some(root) => StorageConfig::with_root(root),
        None => match StorageConfig::from_env() {
            Ok(storage) => storage,
            Err(e) => {
                eprintln!("stint: {e}");
                std::process::exit(1);
            }
        },
    };
    let _logging_guard = logging::init(&storage);

    let result = match cli.command {
        Commands::Stopwatch { simulate } => run::stopwatch(storage, simulate),
        Commands::Countdown {
            hours,
            minutes,
            seconds,
            simulate,
        } => run::countdown(storage, (hours, minutes, seconds), simulate),
        Commands::History { command } => history::run(&storage, command),
        Commands::Display { mode } => run::set_display(storage, mode.into()),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "stint command failed");
        eprintln!("stint: {e}");
        std::process::exit(1);
    }
}

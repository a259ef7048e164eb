//! # stint-core
//!
//! Core library for Stint, a stopwatch and countdown timer that keeps a durable
//! history of completed sessions. Shared by every client (the `stint` CLI,
//! native shells through UniFFI).
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime. Tick sources and the record writer are
//!   plain threads.
//! - **Thread-safe engines**: Each engine serializes its own transitions; the
//!   history store serializes every file operation.
//! - **Graceful degradation**: A missing or corrupt history file reads as empty
//!   (corrupt content is backed up first). A bad config reads as defaults.
//! - **FFI-ready**: UniFFI annotations enable Swift, Kotlin, Python bindings.
//!   Prefer additive public API changes; removing or renaming breaks FFI clients.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use stint_core::{format_duration, DisplayMode, StintApp, TimerMode};
//!
//! let app = StintApp::new()?;
//! app.toggle_start_pause(TimerMode::Stopwatch);
//! // ...
//! app.stop(TimerMode::Stopwatch);
//! app.flush();
//! for entry in app.list_history() {
//!     let duration = Duration::from_nanos(entry.duration_nanos);
//!     println!("{} {}", entry.name, format_duration(duration, DisplayMode::HourMinSec));
//! }
//! ```

// UniFFI scaffolding for Swift/Kotlin/Python bindings
uniffi::setup_scaffolding!();

pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod mirror;
pub mod record;
pub mod session;
pub mod storage;
pub mod store;
pub mod ticker;
pub mod types;
pub mod writer;

mod persist;

pub use app::{HistoryEntry, StintApp};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{load_config, save_config, StintConfig};
pub use error::{Result, StintError, StintFfiError};
pub use format::format_duration;
pub use mirror::{Mirror, MirrorPoller, MirrorSnapshot};
pub use record::{format_timespan, parse_timespan, SessionRecord};
pub use session::{SessionEngine, TickOutcome};
pub use storage::StorageConfig;
pub use store::RecordStore;
pub use ticker::Ticker;
pub use types::{DisplayMode, EngineSnapshot, RunState, TimerMode};
pub use writer::{RecordSink, RecordWriter};

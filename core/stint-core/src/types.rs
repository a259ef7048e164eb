//! Core types shared across all Stint clients.
//!
//! These are the values the presentation layer reads from the engines. They are
//! annotated with UniFFI macros so native shells get the same shapes.

use serde::{Deserialize, Serialize};

/// Which timing mode an engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    Stopwatch,
    Countdown,
}

impl TimerMode {
    /// Prefix for auto-generated session names ("Timer 3", "Countdown 1").
    pub fn name_prefix(self) -> &'static str {
        match self {
            TimerMode::Stopwatch => "Timer",
            TimerMode::Countdown => "Countdown",
        }
    }
}

/// How a duration is rendered for display.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, uniffi::Enum,
)]
#[serde(rename_all = "camelCase")]
pub enum DisplayMode {
    /// `HH:MM:SS`, hours unbounded.
    #[default]
    HourMinSec,
    /// `MM:SS`, minutes unbounded.
    MinSec,
    /// Whole seconds, at least two digits.
    SecOnly,
}

/// Coarse engine state as seen by a presentation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "camelCase")]
pub enum RunState {
    Idle,
    Running,
    Paused,
}

/// Published read-only view of one engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    pub mode: TimerMode,
    pub state: RunState,
    pub display_time: String,
    pub start_button_label: String,
    pub is_running: bool,
    pub elapsed_ms: u64,
    /// Countdown length in milliseconds; `None` for the stopwatch.
    pub target_ms: Option<u64>,
}

//! Display formatting for elapsed and remaining time.
//!
//! Fractional seconds are truncated, never rounded, so a countdown showing
//! `00:00:01` really has at least one full second left.

use std::time::Duration;

use crate::types::DisplayMode;

pub fn format_duration(duration: Duration, mode: DisplayMode) -> String {
    let total_secs = duration.as_secs();
    match mode {
        DisplayMode::HourMinSec => {
            let hours = total_secs / 3600;
            let minutes = (total_secs % 3600) / 60;
            let seconds = total_secs % 60;
            format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
        }
        DisplayMode::MinSec => format!("{:02}:{:02}", total_secs / 60, total_secs % 60),
        DisplayMode::SecOnly => format!("{:02}", total_secs),
    }
}

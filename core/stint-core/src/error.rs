//! Error types for stint-core operations.
//!
//! [`StintError`] is what the engines, the store and the config layer return.
//! Everything exported on [`crate::StintApp`] converts it to [`StintFfiError`]
//! at the boundary, so bindings see one error type with a readable message.

use std::path::PathBuf;

// ═══════════════════════════════════════════════════════════════════════════════
// Boundary Error (returned by StintApp exports)
// ═══════════════════════════════════════════════════════════════════════════════

/// Error raised by the exported `StintApp` methods.
///
/// Constructing the app, `set_target`, `set_display_mode` and the history
/// edits (`save_history_entry`, `rename_history_entry`, `delete_history_entry`,
/// `clear_history` and the rest) all fail with `General`. The message is the
/// `Display` text of the underlying [`StintError`], such as "Session record not
/// found: ..." or "Countdown target can only be changed while the countdown
/// is idle".
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum StintFfiError {
    #[error("{message}")]
    General { message: String },
}

impl From<String> for StintFfiError {
    fn from(message: String) -> Self {
        StintFfiError::General { message }
    }
}

impl From<&str> for StintFfiError {
    fn from(message: &str) -> Self {
        StintFfiError::General {
            message: message.to_string(),
        }
    }
}

impl From<StintError> for StintFfiError {
    fn from(err: StintError) -> Self {
        StintFfiError::General {
            message: err.to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Core Error
// ═══════════════════════════════════════════════════════════════════════════════

/// All errors that can occur in stint-core operations.
///
/// For FFI boundaries, use `StintFfiError` instead.
#[derive(Debug, thiserror::Error)]
pub enum StintError {
    // ─────────────────────────────────────────────────────────────────────
    // Input Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Session record not found: {0}")]
    RecordNotFound(String),

    // ─────────────────────────────────────────────────────────────────────
    // Engine Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Countdown target can only be changed while the countdown is idle")]
    TargetLocked,

    #[error("Operation is only available in countdown mode")]
    NotCountdown,

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Data directory could not be determined")]
    NoDataDir,

    #[error("Path has no parent directory: {0}")]
    NoParentDir(PathBuf),

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StintError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        StintError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        StintError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using StintError.
pub type Result<T> = std::result::Result<T, StintError>;

impl From<StintError> for String {
    fn from(err: StintError) -> String {
        err.to_string()
    }
}

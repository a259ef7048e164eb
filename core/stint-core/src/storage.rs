//! Storage configuration and path management for Stint.
//!
//! Every file path Stint touches is decided here. Production code uses
//! `StorageConfig::from_env()`, which points to `~/.stint/` unless `STINT_HOME`
//! overrides it. Tests use `StorageConfig::with_root(temp_dir)` for isolation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{Result, StintError};

/// Environment variable that relocates the data root.
pub const STINT_HOME_ENV: &str = "STINT_HOME";

/// Central configuration for all Stint storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for all Stint data (default: ~/.stint)
    root: PathBuf,
}

impl StorageConfig {
    /// Resolves the data root from `STINT_HOME`, falling back to `~/.stint`.
    pub fn from_env() -> Result<Self> {
        if let Some(root) = std::env::var_os(STINT_HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::with_root(PathBuf::from(root)));
        }
        let home = dirs::home_dir().ok_or(StintError::NoDataDir)?;
        Ok(Self::with_root(home.join(".stint")))
    }

    /// Creates a StorageConfig with a custom root directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Files
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to history.json (completed sessions, newest first).
    pub fn history_file(&self) -> PathBuf {
        self.root.join("history.json")
    }

    /// Path to config.json (app preferences).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Path to logs/ directory (rolling CLI logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Creates the root directory and `logs/` if missing.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs_err::create_dir_all(&self.root)?;
        fs_err::create_dir_all(self.logs_dir())
    }
}

/// Where an unreadable data file is moved before it is treated as empty.
/// Example: `history.json` -> `history.corrupt-20240301T090000.json`. When that
/// name is already taken (two failures within one second) a counter is added:
/// `history.corrupt-20240301T090000-2.json`.
pub fn corrupt_backup_path(file: &Path, at: DateTime<Utc>) -> PathBuf {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "data".to_string());
    let ext = file.extension().map(|e| e.to_string_lossy().to_string());
    let stamp = at.format("%Y%m%dT%H%M%S").to_string();

    let named = |suffix: String| {
        let name = match &ext {
            Some(ext) => format!("{}.corrupt-{}{}.{}", stem, stamp, suffix, ext),
            None => format!("{}.corrupt-{}{}", stem, stamp, suffix),
        };
        file.with_file_name(name)
    };

    let first = named(String::new());
    if !first.exists() {
        return first;
    }
    (2u32..)
        .map(|n| named(format!("-{}", n)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

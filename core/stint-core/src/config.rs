//! User preferences stored in `config.json`.
//!
//! Loading never fails: a missing file gives defaults, a malformed one is
//! logged and replaced by defaults in memory (the file itself is left alone).
//! Out-of-range values are clamped on load and on save.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, StintError};
use crate::persist::write_atomic;
use crate::storage::StorageConfig;
use crate::store::DEFAULT_MAX_RECORDS;
use crate::types::DisplayMode;

pub const MIN_INTERVAL_MS: u64 = 10;
pub const MAX_INTERVAL_MS: u64 = 1000;
pub const MAX_RECORDS_LIMIT: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StintConfig {
    pub display_mode: DisplayMode,
    /// Period of each engine's tick source.
    pub tick_interval_ms: u64,
    /// Period of mirror polling.
    pub mirror_interval_ms: u64,
    /// Retention cap for history.json.
    pub max_records: usize,
    /// Category stamped on new records.
    pub default_category: String,
}

impl Default for StintConfig {
    fn default() -> Self {
        Self {
            display_mode: DisplayMode::HourMinSec,
            tick_interval_ms: 50,
            mirror_interval_ms: 50,
            max_records: DEFAULT_MAX_RECORDS,
            default_category: String::new(),
        }
    }
}

impl StintConfig {
    /// Returns a copy with every field forced into its valid range.
    pub fn clamped(mut self) -> Self {
        self.tick_interval_ms = self.tick_interval_ms.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS);
        self.mirror_interval_ms = self
            .mirror_interval_ms
            .clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS);
        self.max_records = self.max_records.clamp(1, MAX_RECORDS_LIMIT);
        if self.default_category.chars().count() > crate::record::CATEGORY_MAX_CHARS {
            self.default_category = self
                .default_category
                .chars()
                .take(crate::record::CATEGORY_MAX_CHARS)
                .collect();
        }
        self
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms)
    }

    pub fn mirror_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.mirror_interval_ms)
    }
}

/// Loads config.json, returning defaults if it is missing or unreadable.
pub fn load_config(storage: &StorageConfig) -> StintConfig {
    let path = storage.config_file();
    let content = match fs_err::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return StintConfig::default(),
        Err(err) => {
            warn!(error = %err, "Failed to read config; using defaults");
            return StintConfig::default();
        }
    };

    match serde_json::from_str::<StintConfig>(&content) {
        Ok(config) => config.clamped(),
        Err(err) => {
            warn!(
                error = %err,
                path = %path.display(),
                "Malformed config; using defaults"
            );
            StintConfig::default()
        }
    }
}

/// Writes config.json atomically.
pub fn save_config(storage: &StorageConfig, config: &StintConfig) -> Result<()> {
    let config = config.clone().clamped();
    let content = serde_json::to_string_pretty(&config).map_err(|source| StintError::Json {
        context: "serializing config".to_string(),
        source,
    })?;
    write_atomic(&storage.config_file(), content.as_bytes())
}

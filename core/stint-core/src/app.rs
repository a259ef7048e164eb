//! StintApp - the entry point for Stint clients.
//!
//! Owns one engine per timing mode, the shared history store, and the background
//! record writer. Presentation layers (the CLI, native shells via UniFFI) only
//! ever talk to this type:
//!
//! ```rust,ignore
//! use stint_core::{StintApp, TimerMode};
//!
//! let app = StintApp::new()?;
//! app.toggle_start_pause(TimerMode::Stopwatch);
//! let view = app.snapshot(TimerMode::Stopwatch);
//! println!("{} [{}]", view.display_time, view.start_button_label);
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{load_config, save_config, StintConfig};
use crate::error::{StintError, StintFfiError};
use crate::mirror::Mirror;
use crate::record::SessionRecord;
use crate::session::SessionEngine;
use crate::storage::StorageConfig;
use crate::store::RecordStore;
use crate::ticker::Ticker;
use crate::types::{DisplayMode, EngineSnapshot, RunState, TimerMode};
use crate::writer::{RecordSink, RecordWriter};

/// A completed session as seen across the FFI boundary.
///
/// Timestamps are RFC 3339 strings. Durations are nanoseconds, so an entry read
/// from `list_history` and saved back leaves the stored times untouched.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct HistoryEntry {
    pub id: String,
    pub name: String,
    pub is_countdown: bool,
    pub start_time: String,
    pub end_time: String,
    pub duration_nanos: u64,
    pub countdown_target_nanos: Option<u64>,
    pub notes: String,
    pub created_at: Option<String>,
    pub tags: Vec<String>,
    pub category: String,
}

impl From<SessionRecord> for HistoryEntry {
    fn from(record: SessionRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            is_countdown: record.is_countdown,
            start_time: rfc3339(record.start_time),
            end_time: rfc3339(record.end_time),
            duration_nanos: nanos(record.duration),
            countdown_target_nanos: record.countdown_target.map(nanos),
            notes: record.notes,
            created_at: record.created_at.map(rfc3339),
            tags: record.tags,
            category: record.category,
        }
    }
}

impl TryFrom<HistoryEntry> for SessionRecord {
    type Error = StintError;

    fn try_from(entry: HistoryEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entry.id,
            name: entry.name,
            is_countdown: entry.is_countdown,
            start_time: parse_time("startTime", &entry.start_time)?,
            end_time: parse_time("endTime", &entry.end_time)?,
            duration: Duration::from_nanos(entry.duration_nanos),
            countdown_target: entry.countdown_target_nanos.map(Duration::from_nanos),
            notes: entry.notes,
            created_at: entry
                .created_at
                .as_deref()
                .map(|s| parse_time("createdAt", s))
                .transpose()?,
            tags: entry.tags,
            category: entry.category,
        })
    }
}

/// The main Stint object.
#[derive(uniffi::Object)]
pub struct StintApp {
    // Field order is drop order: tickers stop before the engines go away, and
    // the writer drains its queue after the last engine releases it.
    tickers: Vec<Ticker>,
    stopwatch: Arc<SessionEngine>,
    countdown: Arc<SessionEngine>,
    writer: Arc<RecordWriter>,
    store: Arc<RecordStore>,
    storage: StorageConfig,
    config: Mutex<StintConfig>,
}

impl StintApp {
    /// Creates an app rooted at `storage` using the system clock, with tick
    /// sources running.
    pub fn with_storage(storage: StorageConfig) -> Result<Self, StintFfiError> {
        Self::with_clock(storage, Arc::new(SystemClock), true)
    }

    /// Creates an app driven by `clock`. With `run_tickers` false nothing
    /// advances the engines except explicit `tick` calls, for deterministic tests.
    pub fn with_clock(
        storage: StorageConfig,
        clock: Arc<dyn Clock>,
        run_tickers: bool,
    ) -> Result<Self, StintFfiError> {
        storage
            .ensure_dirs()
            .map_err(|e| StintError::io(format!("creating {}", storage.root().display()), e))?;
        let config = load_config(&storage);

        let store = Arc::new(
            RecordStore::with_clock(storage.history_file(), clock.clone())
                .with_max_records(config.max_records),
        );
        let writer = Arc::new(RecordWriter::spawn(store.clone())?);
        let sink: Arc<dyn RecordSink> = writer.clone();

        let stopwatch = Arc::new(
            SessionEngine::stopwatch(clock.clone(), sink.clone())
                .with_category(config.default_category.clone())
                .with_display_mode(config.display_mode),
        );
        let countdown = Arc::new(
            SessionEngine::countdown(clock, sink)
                .with_category(config.default_category.clone())
                .with_display_mode(config.display_mode),
        );

        let tickers = if run_tickers {
            vec![
                Ticker::spawn(&stopwatch, config.tick_interval())?,
                Ticker::spawn(&countdown, config.tick_interval())?,
            ]
        } else {
            Vec::new()
        };

        info!(
            root = %storage.root().display(),
            max_records = config.max_records,
            "Stint initialized"
        );

        Ok(Self {
            tickers,
            stopwatch,
            countdown,
            writer,
            store,
            storage,
            config: Mutex::new(config),
        })
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    pub fn engine(&self, mode: TimerMode) -> Arc<SessionEngine> {
        match mode {
            TimerMode::Stopwatch => self.stopwatch.clone(),
            TimerMode::Countdown => self.countdown.clone(),
        }
    }

    pub fn store(&self) -> Arc<RecordStore> {
        self.store.clone()
    }

    /// A read-only view of one engine for a secondary surface.
    pub fn mirror(&self, mode: TimerMode) -> Mirror {
        Mirror::new(&self.engine(mode))
    }

    pub fn config(&self) -> StintConfig {
        self.lock_config().clone()
    }

    fn lock_config(&self) -> MutexGuard<'_, StintConfig> {
        self.config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[uniffi::export]
impl StintApp {
    /// Creates an app with the default storage location (`~/.stint`, or
    /// `$STINT_HOME`).
    #[uniffi::constructor]
    pub fn new() -> Result<Self, StintFfiError> {
        Self::with_storage(StorageConfig::from_env()?)
    }

    pub fn data_dir(&self) -> String {
        self.storage.root().to_string_lossy().to_string()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Engine commands
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn toggle_start_pause(&self, mode: TimerMode) -> RunState {
        self.engine(mode).toggle_start_pause()
    }

    /// Stops the engine. Returns the completed session, if any time elapsed.
    /// Persistence happens in the background; call `flush` to wait for it.
    pub fn stop(&self, mode: TimerMode) -> Option<HistoryEntry> {
        self.engine(mode).stop().map(HistoryEntry::from)
    }

    /// Sets the countdown length. Fields are clamped to 0–23 h, 0–59 m, 0–59 s.
    /// Fails unless the countdown is idle.
    pub fn set_target(&self, hours: u32, minutes: u32, seconds: u32) -> Result<(), StintFfiError> {
        self.countdown
            .set_target_hms(hours, minutes, seconds)
            .map_err(StintFfiError::from)
    }

    pub fn snapshot(&self, mode: TimerMode) -> EngineSnapshot {
        self.engine(mode).snapshot()
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.lock_config().display_mode
    }

    /// Changes the display mode of both engines and remembers it in config.json.
    pub fn set_display_mode(&self, display_mode: DisplayMode) -> Result<(), StintFfiError> {
        self.stopwatch.set_display_mode(display_mode);
        self.countdown.set_display_mode(display_mode);

        let mut config = self.lock_config();
        config.display_mode = display_mode;
        save_config(&self.storage, &config).map_err(StintFfiError::from)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // History
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn list_history(&self) -> Vec<HistoryEntry> {
        self.store
            .list()
            .into_iter()
            .map(HistoryEntry::from)
            .collect()
    }

    pub fn get_history_entry(&self, id: String) -> Option<HistoryEntry> {
        self.store.get(&id).map(HistoryEntry::from)
    }

    /// Inserts or replaces (by id) a history entry.
    pub fn save_history_entry(&self, entry: HistoryEntry) -> Result<HistoryEntry, StintFfiError> {
        let record = SessionRecord::try_from(entry)?;
        let saved = self.store.save(record)?;
        Ok(HistoryEntry::from(saved))
    }

    /// Deletes by id. Returns false when no entry had that id.
    pub fn delete_history_entry(&self, id: String) -> Result<bool, StintFfiError> {
        self.store.delete(&id).map_err(StintFfiError::from)
    }

    pub fn rename_history_entry(
        &self,
        id: String,
        name: String,
    ) -> Result<HistoryEntry, StintFfiError> {
        let saved = self.store.update(&id, |r| r.set_name(name))?;
        Ok(HistoryEntry::from(saved))
    }

    pub fn set_history_notes(
        &self,
        id: String,
        notes: String,
    ) -> Result<HistoryEntry, StintFfiError> {
        let saved = self.store.update(&id, |r| r.set_notes(notes))?;
        Ok(HistoryEntry::from(saved))
    }

    pub fn add_history_tag(&self, id: String, tag: String) -> Result<HistoryEntry, StintFfiError> {
        let saved = self.store.update(&id, |r| {
            r.add_tag(&tag);
            Ok(())
        })?;
        Ok(HistoryEntry::from(saved))
    }

    pub fn remove_history_tag(
        &self,
        id: String,
        tag: String,
    ) -> Result<HistoryEntry, StintFfiError> {
        let saved = self.store.update(&id, |r| {
            r.remove_tag(&tag);
            Ok(())
        })?;
        Ok(HistoryEntry::from(saved))
    }

    pub fn clear_history(&self) -> Result<(), StintFfiError> {
        self.store.clear().map_err(StintFfiError::from)
    }

    /// Blocks until every completed session so far has been written.
    pub fn flush(&self) {
        self.writer.flush();
    }
}

impl Drop for StintApp {
    fn drop(&mut self) {
        self.tickers.clear();
        for mode in [TimerMode::Stopwatch, TimerMode::Countdown] {
            if self.engine(mode).state() != RunState::Idle {
                warn!(mode = ?mode, "Closing with an unfinished session; it will not be saved");
            }
        }
    }
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_time(field: &str, value: &str) -> Result<DateTime<Utc>, StintError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StintError::invalid(field, format!("not an RFC 3339 timestamp: {e}")))
}

fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

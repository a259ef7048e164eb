//! File-backed history of completed sessions.
//!
//! The store owns `history.json`: a pretty-printed JSON array of
//! [`SessionRecord`]s, newest first by insertion.
//!
//! # Serialized Access
//!
//! Every public operation takes the store's mutex for its full read-modify-write
//! cycle, so a single `RecordStore` instance gives read-after-write consistency
//! to any number of threads. Separate processes writing the same file are not
//! coordinated.
//!
//! # Unreadable History
//!
//! - Missing file or empty file: empty history
//! - Corrupt JSON (or non-UTF-8 bytes) or an unreadable file on `list`: the file is moved to
//!   `history.corrupt-<timestamp>.json` and an empty history is returned
//! - Corrupt JSON during a mutation: same backup, then the mutation proceeds
//!   against an empty history
//! - Unreadable file during a mutation: the error is returned so a transient
//!   failure never overwrites history we could not read
//!
//! # Atomic Writes
//!
//! Mutations rewrite the whole file through temp file + rename
//! (see `persist::write_atomic`).

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, StintError};
use crate::persist::write_atomic;
use crate::record::{new_record_id, SessionRecord};
use crate::storage::corrupt_backup_path;

/// Retention cap: the oldest records beyond this are dropped on insert.
pub const DEFAULT_MAX_RECORDS: usize = 1000;

enum Loaded {
    Records(Vec<SessionRecord>),
    Corrupt(String),
}

pub struct RecordStore {
    path: PathBuf,
    max_records: usize,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_clock(path, Arc::new(SystemClock))
    }

    /// Uses `clock` for `createdAt` stamps and backup file names.
    pub fn with_clock(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            max_records: DEFAULT_MAX_RECORDS,
            clock,
            lock: Mutex::new(()),
        }
    }

    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────────

    /// All records, newest `createdAt` first. Never fails: unreadable or
    /// malformed history is backed up and reported as empty.
    pub fn list(&self) -> Vec<SessionRecord> {
        let _guard = self.guard();
        let mut records = self.load_for_read();
        // Stable: records sharing a createdAt keep their on-disk order.
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    pub fn get(&self, id: &str) -> Option<SessionRecord> {
        let _guard = self.guard();
        self.load_for_read().into_iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        let _guard = self.guard();
        self.load_for_read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Inserts a new record at the front, or replaces the record with the same id
    /// in place. Returns the record as stored (with `id` and `createdAt` assigned).
    pub fn save(&self, mut record: SessionRecord) -> Result<SessionRecord> {
        record.validate()?;
        record.normalize_tags();
        record.truncate_to_ticks();
        if record.id.trim().is_empty() {
            record.id = new_record_id();
        }

        let _guard = self.guard();
        let mut records = self.load_for_write()?;
        let now = self.clock.now();

        match records.iter().position(|r| r.id == record.id) {
            Some(pos) => {
                let existing = &records[pos];
                check_immutable_fields(existing, &record)?;
                record.created_at = existing.created_at.or(record.created_at).or(Some(now));
                records[pos] = record.clone();
                debug!(record_id = %record.id, "Replaced session record");
            }
            None => {
                record.created_at.get_or_insert(now);
                records.insert(0, record.clone());
                if records.len() > self.max_records {
                    let evicted = records.len() - self.max_records;
                    records.truncate(self.max_records);
                    info!(evicted, cap = self.max_records, "Evicted oldest session records");
                }
                debug!(record_id = %record.id, "Inserted session record");
            }
        }

        self.write_all(&records)?;
        Ok(record)
    }

    /// Removes every record with `id`. Returns whether anything was removed;
    /// an unknown id is not an error.
    pub fn delete(&self, id: &str) -> Result<bool> {
        if id.trim().is_empty() {
            return Err(StintError::invalid("id", "must not be empty"));
        }

        let _guard = self.guard();
        let mut records = self.load_for_write()?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Ok(false);
        }

        self.write_all(&records)?;
        debug!(record_id = %id, "Deleted session record");
        Ok(true)
    }

    /// Applies `edit` to the record with `id` and writes it back in place,
    /// all under one lock acquisition.
    pub fn update<F>(&self, id: &str, edit: F) -> Result<SessionRecord>
    where
        F: FnOnce(&mut SessionRecord) -> Result<()>,
    {
        if id.trim().is_empty() {
            return Err(StintError::invalid("id", "must not be empty"));
        }

        let _guard = self.guard();
        let mut records = self.load_for_write()?;
        let pos = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StintError::RecordNotFound(id.to_string()))?;

        let mut record = records[pos].clone();
        edit(&mut record)?;
        record.validate()?;
        record.normalize_tags();
        record.truncate_to_ticks();
        if record.id != id {
            return Err(StintError::invalid("id", "cannot change once the session is saved"));
        }
        check_immutable_fields(&records[pos], &record)?;
        record.created_at = records[pos].created_at.or(Some(self.clock.now()));

        records[pos] = record.clone();
        self.write_all(&records)?;
        Ok(record)
    }

    pub fn clear(&self) -> Result<()> {
        let _guard = self.guard();
        self.write_all(&[])?;
        info!(path = %self.path.display(), "Cleared session history");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // File access (callers hold the guard)
    // ─────────────────────────────────────────────────────────────────────────────

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_file(&self) -> std::io::Result<Loaded> {
        let content = match fs_err::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Loaded::Records(Vec::new()))
            }
            Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                return Ok(Loaded::Corrupt(err.to_string()))
            }
            Err(err) => return Err(err),
        };

        if content.trim().is_empty() {
            return Ok(Loaded::Records(Vec::new()));
        }

        match serde_json::from_str::<Vec<SessionRecord>>(&content) {
            Ok(records) => Ok(Loaded::Records(records)),
            Err(err) => Ok(Loaded::Corrupt(err.to_string())),
        }
    }

    fn load_for_read(&self) -> Vec<SessionRecord> {
        match self.read_file() {
            Ok(Loaded::Records(records)) => records,
            Ok(Loaded::Corrupt(details)) => {
                warn!(path = %self.path.display(), details = %details, "Malformed history file");
                self.back_up_unreadable();
                Vec::new()
            }
            Err(err) => {
                warn!(error = %err, path = %self.path.display(), "Failed to read history file");
                self.back_up_unreadable();
                Vec::new()
            }
        }
    }

    fn load_for_write(&self) -> Result<Vec<SessionRecord>> {
        match self.read_file() {
            Ok(Loaded::Records(records)) => Ok(records),
            Ok(Loaded::Corrupt(details)) => {
                warn!(path = %self.path.display(), details = %details, "Malformed history file");
                self.back_up_unreadable();
                Ok(Vec::new())
            }
            Err(err) => Err(StintError::io(
                format!("reading {}", self.path.display()),
                err,
            )),
        }
    }

    /// Moves the current file aside. Failures are logged and swallowed.
    fn back_up_unreadable(&self) {
        let backup = corrupt_backup_path(&self.path, self.clock.now());
        match fs_err::rename(&self.path, &backup) {
            Ok(()) => warn!(backup = %backup.display(), "Moved unreadable history aside"),
            Err(err) => warn!(error = %err, "Failed to back up unreadable history"),
        }
    }

    fn write_all(&self, records: &[SessionRecord]) -> Result<()> {
        let content = serde_json::to_string_pretty(records).map_err(|source| StintError::Json {
            context: "serializing history".to_string(),
            source,
        })?;
        write_atomic(&self.path, content.as_bytes())
    }
}

fn check_immutable_fields(existing: &SessionRecord, incoming: &SessionRecord) -> Result<()> {
    if existing.is_countdown != incoming.is_countdown {
        return Err(StintError::invalid(
            "isCountdown",
            "cannot change once the session is saved",
        ));
    }
    if existing.category != incoming.category {
        return Err(StintError::invalid(
            "category",
            "cannot change once the session is saved",
        ));
    }
    Ok(())
}

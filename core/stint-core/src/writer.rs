//! Background persistence of completed sessions.
//!
//! Engines hand finished records to a [`RecordSink`] while holding their own
//! lock, so submission must never block on disk. [`RecordWriter`] queues each
//! record on an unbounded channel and a single worker thread saves them to the
//! [`RecordStore`] in submission order. Every submitted record is saved exactly
//! once; failures are logged and not retried.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, warn};

use crate::error::{Result, StintError};
use crate::record::SessionRecord;
use crate::store::RecordStore;

/// Destination for records produced when a session stops.
pub trait RecordSink: Send + Sync {
    /// Accepts a finished record. Must not block on I/O.
    fn submit(&self, record: SessionRecord);
}

enum Job {
    Save(SessionRecord),
    Flush(Sender<()>),
}

pub struct RecordWriter {
    tx: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl RecordWriter {
    pub fn spawn(store: Arc<RecordStore>) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("stint-record-writer".to_string())
            .spawn(move || run_worker(store, rx))
            .map_err(|e| StintError::io("spawning record writer", e))?;

        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    /// Blocks until every record submitted before this call has been attempted.
    pub fn flush(&self) {
        let Some(tx) = &self.tx else {
            return;
        };
        let (ack_tx, ack_rx) = mpsc::channel();
        if tx.send(Job::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }
}

impl RecordSink for RecordWriter {
    fn submit(&self, record: SessionRecord) {
        let Some(tx) = &self.tx else {
            return;
        };
        let record_id = record.id.clone();
        if tx.send(Job::Save(record)).is_err() {
            error!(record_id = %record_id, "Record writer stopped; session record was not queued");
        }
    }
}

impl Drop for RecordWriter {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain what is queued and exit.
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Record writer thread panicked");
            }
        }
    }
}

fn run_worker(store: Arc<RecordStore>, rx: Receiver<Job>) {
    for job in rx {
        match job {
            Job::Save(record) => {
                let record_id = record.id.clone();
                match store.save(record) {
                    Ok(saved) => debug!(record_id = %saved.id, name = %saved.name, "Session saved"),
                    Err(err) => warn!(
                        error = %err,
                        record_id = %record_id,
                        "Failed to save completed session"
                    ),
                }
            }
            Job::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

//! Periodic tick driver for a [`SessionEngine`].
//!
//! One thread per engine. It holds only a `Weak` handle, so it never keeps an
//! engine alive and exits on its own once the engine is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, StintError};
use crate::session::{SessionEngine, TickOutcome};

pub struct Ticker {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn(engine: &Arc<SessionEngine>, period: Duration) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let source: Weak<SessionEngine> = Arc::downgrade(engine);
        let mode = engine.mode();
        let flag = Arc::clone(&stop);

        let worker = thread::Builder::new()
            .name(format!("stint-ticker-{:?}", mode).to_lowercase())
            .spawn(move || {
                while !flag.load(Ordering::Acquire) {
                    thread::sleep(period);
                    if flag.load(Ordering::Acquire) {
                        break;
                    }
                    let Some(engine) = source.upgrade() else {
                        debug!(mode = ?mode, "Engine dropped; ticker exiting");
                        break;
                    };
                    if engine.tick_now() == TickOutcome::Expired {
                        debug!(mode = ?mode, "Ticker observed countdown expiry");
                    }
                }
            })
            .map_err(|e| StintError::io("spawning ticker", e))?;

        Ok(Self {
            stop,
            worker: Some(worker),
        })
    }

    /// Stops the driver and waits for its thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

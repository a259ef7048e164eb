//! Read-only mirror of an engine's published state.
//!
//! A [`Mirror`] copies the source engine's snapshot into its own slot on each
//! poll and never calls a command on the engine. It holds a `Weak` handle: once
//! the engine is gone, polls become no-ops and the last published view stays
//! readable with `source_alive` cleared.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, StintError};
use crate::session::{SessionEngine, START_LABEL};
use crate::types::EngineSnapshot;

/// What the mirror last saw. `version` increments only when the view changes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MirrorSnapshot {
    pub version: u64,
    pub source_alive: bool,
    pub view: Option<EngineSnapshot>,
}

struct Shared {
    source: Weak<SessionEngine>,
    published: RwLock<MirrorSnapshot>,
}

#[derive(Clone)]
pub struct Mirror {
    shared: Arc<Shared>,
}

impl Mirror {
    pub fn new(source: &Arc<SessionEngine>) -> Self {
        let mirror = Self {
            shared: Arc::new(Shared {
                source: Arc::downgrade(source),
                published: RwLock::new(MirrorSnapshot {
                    version: 0,
                    source_alive: true,
                    view: None,
                }),
            }),
        };
        mirror.poll_once();
        mirror
    }

    /// Reads the source once. Returns true when the published view changed.
    pub fn poll_once(&self) -> bool {
        let Some(engine) = self.shared.source.upgrade() else {
            let mut published = self.write_published();
            let changed = published.source_alive;
            if changed {
                published.source_alive = false;
                published.version += 1;
            }
            return changed;
        };

        let view = engine.snapshot();
        drop(engine);

        let mut published = self.write_published();
        if published.view.as_ref() == Some(&view) {
            return false;
        }
        published.view = Some(view);
        published.version += 1;
        true
    }

    pub fn current(&self) -> MirrorSnapshot {
        self.read_published().clone()
    }

    pub fn version(&self) -> u64 {
        self.read_published().version
    }

    pub fn display_time(&self) -> String {
        self.read_published()
            .view
            .as_ref()
            .map(|v| v.display_time.clone())
            .unwrap_or_default()
    }

    pub fn start_button_label(&self) -> String {
        self.read_published()
            .view
            .as_ref()
            .map(|v| v.start_button_label.clone())
            .unwrap_or_else(|| START_LABEL.to_string())
    }

    pub fn is_running(&self) -> bool {
        let published = self.read_published();
        published.source_alive && published.view.as_ref().is_some_and(|v| v.is_running)
    }

    pub fn is_source_alive(&self) -> bool {
        self.shared.source.strong_count() > 0
    }

    fn read_published(&self) -> RwLockReadGuard<'_, MirrorSnapshot> {
        self.shared
            .published
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_published(&self) -> std::sync::RwLockWriteGuard<'_, MirrorSnapshot> {
        self.shared
            .published
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Polls a [`Mirror`] on its own thread until stopped or the source is gone.
pub struct MirrorPoller {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl MirrorPoller {
    pub fn spawn(mirror: Mirror, interval: Duration) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let worker = thread::Builder::new()
            .name("stint-mirror".to_string())
            .spawn(move || {
                while !flag.load(Ordering::Acquire) {
                    thread::sleep(interval);
                    mirror.poll_once();
                    if !mirror.is_source_alive() {
                        debug!("Mirror source dropped; poller exiting");
                        break;
                    }
                }
            })
            .map_err(|e| StintError::io("spawning mirror poller", e))?;

        Ok(Self {
            stop,
            worker: Some(worker),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, |w| w.is_finished())
    }
}

impl Drop for MirrorPoller {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

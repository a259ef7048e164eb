//! Session engines: the stopwatch and countdown state machines.
//!
//! ```text
//!            toggle                 toggle
//!   Idle ─────────────▶ Running ◀──────────▶ Paused
//!    ▲                     │                   │
//!    └──────── stop ───────┴────── stop ───────┘
//!    ▲                     │
//!    └── countdown expiry ─┘   (tick with remaining <= 0)
//! ```
//!
//! # Serialization
//!
//! All state lives behind one mutex per engine. Commands (`toggle_start_pause`,
//! `start`, `pause`, `stop`, `set_target`) wait for it; `tick` only *tries* it
//! and skips the cycle when a command holds it, so the tick source never stalls.
//! Losing a race is never an error: the caller sees the state left by whichever
//! transition ran last.
//!
//! # Time Accounting
//!
//! While running, `elapsed = now - anchor` where `anchor` is chosen at (re)start
//! as `now - elapsed`, so resuming continues from the frozen value exactly.
//! Published fields (display string, label) reflect the last transition or tick.
//!
//! # Completed Sessions
//!
//! `stop` (or countdown expiry) with `elapsed > 0` builds one [`SessionRecord`]
//! and submits it to the engine's [`RecordSink`] before the lock is released,
//! so a following `start` can never race ahead of the submission.

use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::clock::{span_between, Clock};
use crate::error::{Result, StintError};
use crate::format::format_duration;
use crate::record::SessionRecord;
use crate::types::{DisplayMode, EngineSnapshot, RunState, TimerMode};
use crate::writer::RecordSink;

pub const START_LABEL: &str = "Start";
pub const PAUSE_LABEL: &str = "Pause";
pub const RESUME_LABEL: &str = "Resume";

pub const MAX_TARGET_HOURS: u32 = 23;
pub const MAX_TARGET_MINUTES: u32 = 59;
pub const MAX_TARGET_SECONDS: u32 = 59;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running { anchor: DateTime<Utc> },
    Paused,
}

impl Phase {
    fn run_state(self) -> RunState {
        match self {
            Phase::Idle => RunState::Idle,
            Phase::Running { .. } => RunState::Running,
            Phase::Paused => RunState::Paused,
        }
    }
}

#[derive(Debug)]
struct EngineState {
    phase: Phase,
    elapsed: Duration,
    /// Countdown length; always zero for the stopwatch.
    target: Duration,
    /// First start of the current session.
    session_started_at: Option<DateTime<Utc>>,
    /// Number used for the next auto-generated session name. Starts at 1 per process.
    next_number: u32,
    display_mode: DisplayMode,
}

/// What a call to [`SessionEngine::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A command held the engine; try again next period.
    Skipped,
    NotRunning,
    Advanced,
    /// The countdown reached zero and the engine stopped itself.
    Expired,
}

/// One timing engine. Share it as `Arc<SessionEngine>`; every presentation
/// surface holding the handle drives the same state.
pub struct SessionEngine {
    mode: TimerMode,
    category: String,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn RecordSink>,
    state: Mutex<EngineState>,
}

impl SessionEngine {
    pub fn new(mode: TimerMode, clock: Arc<dyn Clock>, sink: Arc<dyn RecordSink>) -> Self {
        Self {
            mode,
            category: String::new(),
            clock,
            sink,
            state: Mutex::new(EngineState {
                phase: Phase::Idle,
                elapsed: Duration::ZERO,
                target: Duration::ZERO,
                session_started_at: None,
                next_number: 1,
                display_mode: DisplayMode::default(),
            }),
        }
    }

    pub fn stopwatch(clock: Arc<dyn Clock>, sink: Arc<dyn RecordSink>) -> Self {
        Self::new(TimerMode::Stopwatch, clock, sink)
    }

    pub fn countdown(clock: Arc<dyn Clock>, sink: Arc<dyn RecordSink>) -> Self {
        Self::new(TimerMode::Countdown, clock, sink)
    }

    /// Category stamped on every record this engine produces.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_display_mode(self, display_mode: DisplayMode) -> Self {
        self.lock_state().display_mode = display_mode;
        self
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────────

    /// Starts or resumes when idle/paused, pauses when running.
    /// Returns the state after the transition.
    pub fn toggle_start_pause(&self) -> RunState {
        let now = self.clock.now();
        let mut state = self.lock_state();
        let phase = state.phase;
        match phase {
            Phase::Idle | Phase::Paused => self.begin(&mut state, now),
            Phase::Running { anchor } => self.halt(&mut state, anchor, now),
        }
        state.phase.run_state()
    }

    /// Starts or resumes. No-op while running.
    pub fn start(&self) -> RunState {
        let now = self.clock.now();
        let mut state = self.lock_state();
        if !matches!(state.phase, Phase::Running { .. }) {
            self.begin(&mut state, now);
        }
        state.phase.run_state()
    }

    /// Pauses. No-op unless running.
    pub fn pause(&self) -> RunState {
        let now = self.clock.now();
        let mut state = self.lock_state();
        if let Phase::Running { anchor } = state.phase {
            self.halt(&mut state, anchor, now);
        }
        state.phase.run_state()
    }

    /// Ends the session and resets to idle. Returns the record handed to the
    /// sink, or `None` when nothing had elapsed.
    pub fn stop(&self) -> Option<SessionRecord> {
        let now = self.clock.now();
        let mut state = self.lock_state();
        if let Phase::Running { anchor } = state.phase {
            let raw = span_between(anchor, now).max(state.elapsed);
            state.elapsed = self.bounded(raw, state.target);
        }
        self.finish(&mut state, now)
    }

    /// Advances a running engine to `now`. Expires a countdown whose remaining
    /// time reaches zero.
    pub fn tick(&self, now: DateTime<Utc>) -> TickOutcome {
        let mut state = match self.state.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                debug!(mode = ?self.mode, "Tick skipped; engine busy");
                return TickOutcome::Skipped;
            }
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let Phase::Running { anchor } = state.phase else {
            return TickOutcome::NotRunning;
        };

        let raw = span_between(anchor, now).max(state.elapsed);
        if self.mode == TimerMode::Countdown && raw >= state.target {
            self.expire(&mut state, anchor);
            return TickOutcome::Expired;
        }
        state.elapsed = raw;
        TickOutcome::Advanced
    }

    /// Ticks with the engine's own clock.
    pub fn tick_now(&self) -> TickOutcome {
        self.tick(self.clock.now())
    }

    /// Sets the countdown length. Only allowed while idle.
    pub fn set_target(&self, target: Duration) -> Result<()> {
        if self.mode != TimerMode::Countdown {
            return Err(StintError::NotCountdown);
        }
        let mut state = self.lock_state();
        if state.phase != Phase::Idle {
            return Err(StintError::TargetLocked);
        }
        state.target = target;
        state.elapsed = Duration::ZERO;
        Ok(())
    }

    /// Sets the countdown length from clock fields, clamping hours to 0–23 and
    /// minutes/seconds to 0–59.
    pub fn set_target_hms(&self, hours: u32, minutes: u32, seconds: u32) -> Result<()> {
        let secs = u64::from(hours.min(MAX_TARGET_HOURS)) * 3600
            + u64::from(minutes.min(MAX_TARGET_MINUTES)) * 60
            + u64::from(seconds.min(MAX_TARGET_SECONDS));
        self.set_target(Duration::from_secs(secs))
    }

    pub fn set_display_mode(&self, display_mode: DisplayMode) {
        self.lock_state().display_mode = display_mode;
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Published state
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> EngineSnapshot {
        let state = self.lock_state();
        let run_state = state.phase.run_state();
        EngineSnapshot {
            mode: self.mode,
            state: run_state,
            display_time: format_duration(self.shown(&state), state.display_mode),
            start_button_label: label_for(run_state).to_string(),
            is_running: run_state == RunState::Running,
            elapsed_ms: millis(state.elapsed),
            target_ms: (self.mode == TimerMode::Countdown).then(|| millis(state.target)),
        }
    }

    pub fn display_time(&self) -> String {
        let state = self.lock_state();
        format_duration(self.shown(&state), state.display_mode)
    }

    pub fn start_button_label(&self) -> &'static str {
        label_for(self.state())
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    pub fn state(&self) -> RunState {
        self.lock_state().phase.run_state()
    }

    /// Elapsed time as of the last transition or tick.
    pub fn elapsed(&self) -> Duration {
        self.lock_state().elapsed
    }

    /// Countdown time left; `None` for the stopwatch.
    pub fn remaining(&self) -> Option<Duration> {
        let state = self.lock_state();
        (self.mode == TimerMode::Countdown).then(|| state.target.saturating_sub(state.elapsed))
    }

    pub fn target(&self) -> Option<Duration> {
        let state = self.lock_state();
        (self.mode == TimerMode::Countdown).then_some(state.target)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Transitions (caller holds the lock)
    // ─────────────────────────────────────────────────────────────────────────────

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin(&self, state: &mut EngineState, now: DateTime<Utc>) {
        if state.phase == Phase::Idle {
            state.elapsed = Duration::ZERO;
            state.session_started_at = Some(now);
        }
        let anchor = now - to_chrono(state.elapsed);
        state.phase = Phase::Running { anchor };
        debug!(mode = ?self.mode, elapsed_ms = millis(state.elapsed), "Engine running");
    }

    fn halt(&self, state: &mut EngineState, anchor: DateTime<Utc>, now: DateTime<Utc>) {
        let raw = span_between(anchor, now).max(state.elapsed);
        if self.mode == TimerMode::Countdown && raw >= state.target {
            self.expire(state, anchor);
            return;
        }
        state.elapsed = raw;
        state.phase = Phase::Paused;
        debug!(mode = ?self.mode, elapsed_ms = millis(state.elapsed), "Engine paused");
    }

    fn expire(&self, state: &mut EngineState, anchor: DateTime<Utc>) {
        state.elapsed = state.target;
        let expired_at = anchor + to_chrono(state.target);
        info!(target_ms = millis(state.target), "Countdown expired");
        self.finish(state, expired_at);
    }

    fn finish(&self, state: &mut EngineState, now: DateTime<Utc>) -> Option<SessionRecord> {
        let elapsed = state.elapsed;
        let started_at = state.session_started_at.take();
        state.phase = Phase::Idle;
        state.elapsed = Duration::ZERO;

        if elapsed.is_zero() {
            return None;
        }

        let number = state.next_number;
        state.next_number = state.next_number.saturating_add(1);
        let name = format!("{} {}", self.mode.name_prefix(), number);
        let start_time = started_at.unwrap_or_else(|| now - to_chrono(elapsed));
        let end_time = now.max(start_time);

        let record = match self.mode {
            TimerMode::Stopwatch => SessionRecord::stopwatch(name, start_time, end_time, elapsed),
            TimerMode::Countdown => {
                SessionRecord::countdown(name, start_time, end_time, elapsed, state.target)
            }
        }
        .with_category(self.category.clone());

        info!(
            mode = ?self.mode,
            record_id = %record.id,
            name = %record.name,
            duration_ms = millis(elapsed),
            "Session completed"
        );
        self.sink.submit(record.clone());
        Some(record)
    }

    fn bounded(&self, elapsed: Duration, target: Duration) -> Duration {
        match self.mode {
            TimerMode::Stopwatch => elapsed,
            TimerMode::Countdown => elapsed.min(target),
        }
    }

    fn shown(&self, state: &EngineState) -> Duration {
        match self.mode {
            TimerMode::Stopwatch => state.elapsed,
            TimerMode::Countdown => state.target.saturating_sub(state.elapsed),
        }
    }
}

fn label_for(state: RunState) -> &'static str {
    match state {
        RunState::Idle => START_LABEL,
        RunState::Running => PAUSE_LABEL,
        RunState::Paused => RESUME_LABEL,
    }
}

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::zero())
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    #[derive(Default)]
    struct Collected(Mutex<Vec<SessionRecord>>);

    impl RecordSink for Collected {
        fn submit(&self, record: SessionRecord) {
            self.0.lock().unwrap().push(record);
        }
    }

    impl Collected {
        fn records(&self) -> Vec<SessionRecord> {
            self.0.lock().unwrap().clone()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn setup(mode: TimerMode) -> (SessionEngine, Arc<ManualClock>, Arc<Collected>) {
        let clock = Arc::new(ManualClock::new(t0()));
        let sink = Arc::new(Collected::default());
        let engine = SessionEngine::new(mode, clock.clone(), sink.clone());
        (engine, clock, sink)
    }

    #[test]
    fn test_idle_snapshot() {
        let (engine, _, _) = setup(TimerMode::Stopwatch);
        let snap = engine.snapshot();
        assert_eq!(snap.state, RunState::Idle);
        assert_eq!(snap.display_time, "00:00:00");
        assert_eq!(snap.start_button_label, START_LABEL);
        assert!(!snap.is_running);
        assert_eq!(snap.target_ms, None);
    }

    #[test]
    fn test_toggle_cycles_labels() {
        let (engine, clock, _) = setup(TimerMode::Stopwatch);
        assert_eq!(engine.toggle_start_pause(), RunState::Running);
        assert_eq!(engine.start_button_label(), PAUSE_LABEL);
        clock.advance(secs(1));
        assert_eq!(engine.toggle_start_pause(), RunState::Paused);
        assert_eq!(engine.start_button_label(), RESUME_LABEL);
        assert_eq!(engine.toggle_start_pause(), RunState::Running);
    }

    #[test]
    fn test_tick_advances_display() {
        let (engine, clock, _) = setup(TimerMode::Stopwatch);
        engine.toggle_start_pause();
        let now = clock.advance(Duration::from_millis(65_400));
        assert_eq!(engine.tick(now), TickOutcome::Advanced);
        assert_eq!(engine.display_time(), "00:01:05");
        assert_eq!(engine.elapsed(), Duration::from_millis(65_400));
    }

    #[test]
    fn test_tick_when_idle_is_noop() {
        let (engine, clock, _) = setup(TimerMode::Stopwatch);
        assert_eq!(engine.tick(clock.now()), TickOutcome::NotRunning);
        assert_eq!(engine.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_tick_is_skipped_while_command_holds_lock() {
        let (engine, clock, _) = setup(TimerMode::Stopwatch);
        engine.toggle_start_pause();
        let guard = engine.lock_state();
        assert_eq!(engine.tick(clock.advance(secs(1))), TickOutcome::Skipped);
        drop(guard);
        assert_eq!(engine.tick(clock.now()), TickOutcome::Advanced);
    }

    #[test]
    fn test_pause_resume_preserves_elapsed() {
        let (engine, clock, sink) = setup(TimerMode::Stopwatch);

        engine.toggle_start_pause();
        clock.advance(secs(5));
        engine.toggle_start_pause();
        assert_eq!(engine.elapsed(), secs(5));

        clock.advance(secs(5));
        engine.tick(clock.now());
        assert_eq!(engine.elapsed(), secs(5));

        engine.toggle_start_pause();
        clock.advance(secs(3));
        let record = engine.stop().unwrap();

        assert_eq!(record.duration, secs(8));
        assert!(!record.is_countdown);
        assert_eq!(record.start_time, t0());
        assert_eq!(record.end_time, t0() + chrono::Duration::seconds(13));
        assert_eq!(sink.records().len(), 1);
        assert_eq!(engine.state(), RunState::Idle);
        assert_eq!(engine.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_many_pause_cycles_do_not_drift() {
        let (engine, clock, _) = setup(TimerMode::Stopwatch);
        for _ in 0..50 {
            engine.start();
            clock.advance(Duration::from_millis(1_234));
            engine.pause();
            clock.advance(Duration::from_millis(777));
        }
        assert_eq!(engine.elapsed(), Duration::from_millis(50 * 1_234));
    }

    #[test]
    fn test_repeated_pause_and_start_are_idempotent() {
        let (engine, clock, _) = setup(TimerMode::Stopwatch);
        engine.start();
        clock.advance(secs(2));
        assert_eq!(engine.start(), RunState::Running);
        assert_eq!(engine.pause(), RunState::Paused);
        clock.advance(secs(2));
        assert_eq!(engine.pause(), RunState::Paused);
        assert_eq!(engine.elapsed(), secs(2));
    }

    #[test]
    fn test_pause_when_idle_does_nothing() {
        let (engine, _, _) = setup(TimerMode::Stopwatch);
        assert_eq!(engine.pause(), RunState::Idle);
    }

    #[test]
    fn test_zero_elapsed_stop_emits_nothing() {
        let (engine, _, sink) = setup(TimerMode::Stopwatch);
        engine.toggle_start_pause();
        assert!(engine.stop().is_none());
        assert!(engine.stop().is_none());
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_names_count_up_per_engine() {
        let (engine, clock, _) = setup(TimerMode::Stopwatch);
        let mut names = Vec::new();
        for _ in 0..3 {
            engine.start();
            clock.advance(secs(1));
            names.push(engine.stop().unwrap().name);
        }
        assert_eq!(names, vec!["Timer 1", "Timer 2", "Timer 3"]);
    }

    #[test]
    fn test_empty_stop_does_not_consume_a_number() {
        let (engine, clock, _) = setup(TimerMode::Stopwatch);
        engine.start();
        engine.stop();
        engine.start();
        clock.advance(secs(1));
        assert_eq!(engine.stop().unwrap().name, "Timer 1");
    }

    #[test]
    fn test_stop_from_paused_uses_frozen_elapsed() {
        let (engine, clock, _) = setup(TimerMode::Stopwatch);
        engine.start();
        clock.advance(secs(4));
        engine.pause();
        clock.advance(secs(100));
        assert_eq!(engine.stop().unwrap().duration, secs(4));
    }

    #[test]
    fn test_category_is_stamped_on_records() {
        let clock = Arc::new(ManualClock::new(t0()));
        let sink = Arc::new(Collected::default());
        let engine = SessionEngine::stopwatch(clock.clone(), sink).with_category("work");
        engine.start();
        clock.advance(secs(1));
        assert_eq!(engine.stop().unwrap().category, "work");
    }

    #[test]
    fn test_countdown_displays_remaining() {
        let (engine, clock, _) = setup(TimerMode::Countdown);
        engine.set_target_hms(0, 1, 30).unwrap();
        assert_eq!(engine.display_time(), "00:01:30");

        engine.start();
        engine.tick(clock.advance(Duration::from_millis(10_500)));
        assert_eq!(engine.display_time(), "00:01:19");
        assert_eq!(engine.remaining(), Some(Duration::from_millis(79_500)));
    }

    #[test]
    fn test_countdown_expires_at_target() {
        let (engine, clock, sink) = setup(TimerMode::Countdown);
        engine.set_target_hms(0, 0, 30).unwrap();
        engine.start();

        for _ in 0..29 {
            assert_eq!(engine.tick(clock.advance(secs(1))), TickOutcome::Advanced);
        }
        assert_eq!(engine.tick(clock.advance(secs(6))), TickOutcome::Expired);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].duration, secs(30));
        assert_eq!(records[0].countdown_target, Some(secs(30)));
        assert!(records[0].is_countdown);
        assert_eq!(records[0].name, "Countdown 1");
        assert_eq!(records[0].end_time, t0() + chrono::Duration::seconds(30));
        assert_eq!(engine.state(), RunState::Idle);
        assert_eq!(engine.display_time(), "00:00:30");
        assert_eq!(engine.tick(clock.advance(secs(1))), TickOutcome::NotRunning);
    }

    #[test]
    fn test_zero_target_expires_on_first_tick_without_record() {
        let (engine, clock, sink) = setup(TimerMode::Countdown);
        engine.start();
        assert_eq!(engine.tick(clock.advance(Duration::from_millis(50))), TickOutcome::Expired);
        assert_eq!(engine.state(), RunState::Idle);
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_countdown_stop_before_expiry_records_partial() {
        let (engine, clock, _) = setup(TimerMode::Countdown);
        engine.set_target(secs(60)).unwrap();
        engine.start();
        clock.advance(secs(20));
        let record = engine.stop().unwrap();
        assert_eq!(record.duration, secs(20));
        assert_eq!(record.countdown_target, Some(secs(60)));
    }

    #[test]
    fn test_countdown_stop_after_missed_expiry_is_clamped() {
        let (engine, clock, _) = setup(TimerMode::Countdown);
        engine.set_target(secs(10)).unwrap();
        engine.start();
        clock.advance(secs(25));
        assert_eq!(engine.stop().unwrap().duration, secs(10));
    }

    #[test]
    fn test_countdown_pause_after_missed_expiry_expires() {
        let (engine, clock, sink) = setup(TimerMode::Countdown);
        engine.set_target(secs(10)).unwrap();
        engine.start();
        clock.advance(secs(12));
        assert_eq!(engine.toggle_start_pause(), RunState::Idle);
        assert_eq!(sink.records()[0].duration, secs(10));
    }

    #[test]
    fn test_set_target_only_while_idle() {
        let (engine, clock, _) = setup(TimerMode::Countdown);
        engine.set_target(secs(60)).unwrap();
        engine.start();
        assert!(matches!(engine.set_target(secs(5)), Err(StintError::TargetLocked)));
        clock.advance(secs(1));
        engine.pause();
        assert!(matches!(engine.set_target(secs(5)), Err(StintError::TargetLocked)));
        assert_eq!(engine.target(), Some(secs(60)));
        engine.stop();
        engine.set_target(secs(5)).unwrap();
        assert_eq!(engine.display_time(), "00:00:05");
    }

    #[test]
    fn test_set_target_on_stopwatch_is_rejected() {
        let (engine, _, _) = setup(TimerMode::Stopwatch);
        assert!(matches!(engine.set_target(secs(5)), Err(StintError::NotCountdown)));
        assert_eq!(engine.target(), None);
        assert_eq!(engine.remaining(), None);
    }

    #[test]
    fn test_set_target_hms_clamps_fields() {
        let (engine, _, _) = setup(TimerMode::Countdown);
        engine.set_target_hms(99, 75, 60).unwrap();
        assert_eq!(engine.target(), Some(secs(23 * 3600 + 59 * 60 + 59)));
    }

    #[test]
    fn test_display_mode_applies_to_snapshot() {
        let (engine, clock, _) = setup(TimerMode::Stopwatch);
        engine.set_display_mode(DisplayMode::SecOnly);
        engine.start();
        engine.tick(clock.advance(secs(75)));
        assert_eq!(engine.snapshot().display_time, "75");
    }

    #[test]
    fn test_backwards_clock_never_decreases_elapsed() {
        let (engine, clock, _) = setup(TimerMode::Stopwatch);
        engine.start();
        engine.tick(clock.advance(secs(10)));
        clock.set(t0() + chrono::Duration::seconds(3));
        assert_eq!(engine.tick_now(), TickOutcome::Advanced);
        assert_eq!(engine.elapsed(), secs(10));
    }

    #[test]
    fn test_stop_after_clock_jumps_back_keeps_elapsed() {
        let (engine, clock, sink) = setup(TimerMode::Stopwatch);
        engine.start();
        engine.tick(clock.advance(secs(10)));
        clock.set(t0() - chrono::Duration::minutes(5));
        engine.stop();

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].duration, secs(10));
        assert!(records[0].end_time >= records[0].start_time);
    }

    #[test]
    fn test_concurrent_toggles_serialize() {
        let (engine, _, _) = setup(TimerMode::Stopwatch);
        let engine = Arc::new(engine);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || engine.toggle_start_pause())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        // An even number of toggles from Idle lands on Paused.
        assert_eq!(engine.state(), RunState::Paused);
    }
}

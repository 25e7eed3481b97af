//! Tracing engine contract and a reference in-process engine
//!
//! The wrapper in [`crate::instrument`] only needs the [`TracingEngine`]
//! trait: register a function, switch counting on and off, and read a
//! snapshot. [`LineProfiler`] is a small single-threaded implementation that
//! times line events reported through [`Frame`].
//!
//! Counting is a nesting counter, not a lock. Recording happens only while
//! the depth is above zero. When the depth returns to zero every pending
//! line event is charged up to that instant and discarded, so time spent
//! while counting is off (e.g. between generator resumptions) never lands
//! on a line.

use crate::persistence;
use crate::report::ReportOptions;
use crate::source::SourceCache;
use crate::stats::{FunctionKey, StatsSnapshot, StatsTracker};
use crate::text_output;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;
use std::time::Instant;

/// Collaborator contract of a per-line tracing engine
pub trait TracingEngine {
    /// Declare a function as tracked (idempotent)
    fn register(&self, key: &FunctionKey);
    /// Increment the counting depth
    fn enable(&self);
    /// Decrement the counting depth; must pair with a previous `enable`
    fn disable(&self);
    /// Read-only copy of the statistics gathered so far
    fn snapshot(&self) -> StatsSnapshot;
}

/// Keeps counting enabled for its lifetime
///
/// `disable()` runs on drop, including during unwinding.
#[must_use = "counting stops as soon as the guard is dropped"]
pub struct EnableGuard<'a, E: TracingEngine + ?Sized> {
    engine: &'a E,
}

impl<'a, E: TracingEngine + ?Sized> EnableGuard<'a, E> {
    pub fn new(engine: &'a E) -> Self {
        engine.enable();
        Self { engine }
    }
}

impl<E: TracingEngine + ?Sized> Drop for EnableGuard<'_, E> {
    fn drop(&mut self) {
        self.engine.disable();
    }
}

/// Run `f` with counting enabled
pub fn run_call<E, F, R>(engine: &E, f: F) -> R
where
    E: TracingEngine + ?Sized,
    F: FnOnce() -> R,
{
    let _guard = EnableGuard::new(engine);
    f()
}

/// Source of raw ticks
pub trait Clock {
    /// Current tick count
    fn now(&self) -> u64;
    /// Seconds per tick
    fn unit(&self) -> f64;
}

/// Wall clock with nanosecond ticks
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    fn unit(&self) -> f64 {
        1e-9
    }
}

/// Manually advanced clock
///
/// Clones share the same tick counter, so a test can keep one handle and
/// give another to the profiler.
#[derive(Debug, Clone)]
pub struct ManualClock {
    ticks: Rc<Cell<u64>>,
    unit: f64,
}

impl ManualClock {
    pub fn new(unit: f64) -> Self {
        Self {
            ticks: Rc::new(Cell::new(0)),
            unit,
        }
    }

    pub fn advance(&self, ticks: u64) {
        self.ticks.set(self.ticks.get().saturating_add(ticks));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.ticks.get()
    }

    fn unit(&self) -> f64 {
        self.unit
    }
}

/// Line currently executing in a function, waiting for its end time
#[derive(Debug, Clone)]
struct PendingLine {
    frame: u64,
    line: u32,
    since: u64,
}

/// Single-threaded line profiler
///
/// Not `Sync`: sharing one profiler between threads is not supported.
pub struct LineProfiler<C: Clock = MonotonicClock> {
    clock: C,
    depth: Cell<u32>,
    tracker: RefCell<StatsTracker>,
    pending: RefCell<HashMap<FunctionKey, PendingLine>>,
    next_frame: Cell<u64>,
}

impl LineProfiler<MonotonicClock> {
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new())
    }
}

impl Default for LineProfiler<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> LineProfiler<C> {
    pub fn with_clock(clock: C) -> Self {
        let unit = clock.unit();
        Self {
            clock,
            depth: Cell::new(0),
            tracker: RefCell::new(StatsTracker::new(unit)),
            pending: RefCell::new(HashMap::new()),
            next_frame: Cell::new(0),
        }
    }

    /// Register a function for profiling
    pub fn add_function(&self, key: &FunctionKey) {
        if self.tracker.borrow_mut().register(key) {
            tracing::debug!(function = %key, "registered function");
        }
    }

    /// Current counting depth
    pub fn depth(&self) -> u32 {
        self.depth.get()
    }

    pub fn is_enabled(&self) -> bool {
        self.depth.get() > 0
    }

    pub fn timer_unit(&self) -> f64 {
        self.clock.unit()
    }

    /// Accumulate `elapsed` ticks on `line` of `key`
    ///
    /// Ignored while counting is disabled or when the function was never
    /// registered.
    pub fn record(&self, key: &FunctionKey, line: u32, elapsed: u64) {
        if !self.is_enabled() {
            return;
        }
        let mut tracker = self.tracker.borrow_mut();
        if !tracker.is_registered(key) {
            tracing::debug!(function = %key, line, "dropping record for unregistered function");
            return;
        }
        tracker.record(key, line, elapsed);
    }

    /// Start a new invocation frame of `key`
    pub fn frame(&self, key: &FunctionKey) -> Frame<'_, C> {
        let id = self.next_frame.get();
        self.next_frame.set(id + 1);
        Frame {
            profiler: self,
            id,
            key: key.clone(),
        }
    }

    /// Run `f` with counting enabled
    pub fn run_call<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        run_call(self, f)
    }

    /// Write the text report for the current statistics
    pub fn print_stats<W: Write>(&self, out: &mut W, human_readable: bool) -> std::io::Result<()> {
        let options = ReportOptions {
            human_readable,
            ..ReportOptions::default()
        };
        let mut sources = SourceCache::new();
        text_output::write_text(out, &self.snapshot(), &mut sources, &options)
    }

    /// Persist the current statistics to `path`
    pub fn dump_stats(&self, path: impl AsRef<Path>) -> persistence::Result<()> {
        persistence::save(&self.snapshot(), path)
    }

    fn line_event(&self, frame: u64, key: &FunctionKey, line: u32) {
        if !self.is_enabled() {
            return;
        }
        let now = self.clock.now();
        // One pending line per function: a recursive entry ends the caller's
        // line, so nested time is charged to the nested frame only.
        let previous = self
            .pending
            .borrow_mut()
            .insert(key.clone(), PendingLine { frame, line, since: now });
        if let Some(previous) = previous {
            self.record(key, previous.line, now.saturating_sub(previous.since));
        }
    }

    fn frame_exit(&self, frame: u64, key: &FunctionKey) {
        let pending = {
            let mut pending = self.pending.borrow_mut();
            let owned = pending.get(key).is_some_and(|p| p.frame == frame);
            if owned {
                pending.remove(key)
            } else {
                None
            }
        };
        if let Some(pending) = pending {
            let now = self.clock.now();
            self.record(key, pending.line, now.saturating_sub(pending.since));
        }
    }

    fn flush_pending(&self) {
        let now = self.clock.now();
        let drained: Vec<(FunctionKey, PendingLine)> = self.pending.borrow_mut().drain().collect();
        for (key, pending) in drained {
            self.record(&key, pending.line, now.saturating_sub(pending.since));
        }
    }
}

impl<C: Clock> TracingEngine for LineProfiler<C> {
    fn register(&self, key: &FunctionKey) {
        self.add_function(key);
    }

    fn enable(&self) {
        self.depth.set(self.depth.get() + 1);
    }

    fn disable(&self) {
        let depth = self.depth.get();
        assert!(depth > 0, "disable() called without a matching enable()");
        if depth == 1 {
            // Still enabled here, so pending lines are charged before the switch.
            self.flush_pending();
        }
        self.depth.set(depth - 1);
    }

    fn snapshot(&self) -> StatsSnapshot {
        self.tracker.borrow().snapshot()
    }
}

/// One invocation of a profiled function
///
/// Each `line` call ends the pending line of this function and starts a new
/// one. Dropping the frame ends its last line unless a nested frame of the
/// same function already did.
pub struct Frame<'p, C: Clock = MonotonicClock> {
    profiler: &'p LineProfiler<C>,
    id: u64,
    key: FunctionKey,
}

impl<C: Clock> Frame<'_, C> {
    /// Report that execution reached `line`
    pub fn line(&self, line: u32) {
        self.profiler.line_event(self.id, &self.key, line);
    }
}

impl<C: Clock> Drop for Frame<'_, C> {
    fn drop(&mut self) {
        self.profiler.frame_exit(self.id, &self.key);
    }
}

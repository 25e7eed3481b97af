//! Per-line statistics model
//!
//! Accumulates (hits, time) for every observed line of every registered
//! function. Times are raw ticks of the global timer unit.

use std::collections::BTreeMap;
use std::fmt;

/// Identity of an instrumented function
///
/// Field order matters: the derived `Ord` sorts by file, then start line,
/// then name, which is the order reports list functions in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FunctionKey {
    /// Source file path as recorded by the tracer
    pub file: String,
    /// First line of the function definition (1-based)
    pub start_line: u32,
    /// Function name
    pub name: String,
}

impl FunctionKey {
    pub fn new(file: impl Into<String>, start_line: u32, name: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            start_line,
            name: name.into(),
        }
    }
}

impl fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.file, self.start_line, self.name)
    }
}

/// Accumulated statistics for one source line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRecord {
    /// Line number (1-based)
    pub line: u32,
    /// Number of times the line executed (always >= 1)
    pub hits: u64,
    /// Total time spent on the line, in timer ticks
    pub time: u64,
}

impl LineRecord {
    /// Time per hit in ticks
    pub fn per_hit(&self) -> f64 {
        self.time as f64 / self.hits as f64
    }
}

/// Immutable copy of the accumulated statistics
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    /// Seconds per tick
    pub timer_unit: f64,
    /// Line records per function, each sorted by ascending line number
    pub timings: BTreeMap<FunctionKey, Vec<LineRecord>>,
}

impl StatsSnapshot {
    pub fn new(timer_unit: f64) -> Self {
        Self {
            timer_unit,
            timings: BTreeMap::new(),
        }
    }

    /// Total ticks recorded for a function (sum of its line times)
    pub fn function_total_time(&self, key: &FunctionKey) -> u64 {
        self.timings
            .get(key)
            .map(|lines| total_time(lines))
            .unwrap_or(0)
    }

    /// Number of functions in the snapshot
    pub fn len(&self) -> usize {
        self.timings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timings.is_empty()
    }
}

/// Sum of line times
pub fn total_time(lines: &[LineRecord]) -> u64 {
    lines.iter().map(|l| l.time).sum()
}

/// Per-function accumulator: line number -> (hits, time)
#[derive(Debug, Clone, Default)]
struct FunctionLines {
    lines: BTreeMap<u32, (u64, u64)>,
}

/// Tracks line statistics for all registered functions
#[derive(Debug)]
pub struct StatsTracker {
    timer_unit: f64,
    functions: BTreeMap<FunctionKey, FunctionLines>,
}

impl StatsTracker {
    /// Create an empty tracker for the given timer unit (seconds per tick)
    pub fn new(timer_unit: f64) -> Self {
        Self {
            timer_unit,
            functions: BTreeMap::new(),
        }
    }

    pub fn timer_unit(&self) -> f64 {
        self.timer_unit
    }

    /// Declare a function as tracked. Registering twice is a no-op.
    ///
    /// Returns true if the function was newly registered.
    pub fn register(&mut self, key: &FunctionKey) -> bool {
        if self.functions.contains_key(key) {
            return false;
        }
        self.functions.insert(key.clone(), FunctionLines::default());
        true
    }

    pub fn is_registered(&self, key: &FunctionKey) -> bool {
        self.functions.contains_key(key)
    }

    /// Record one execution of `line` that took `elapsed` ticks
    ///
    /// Unregistered functions are registered implicitly.
    pub fn record(&mut self, key: &FunctionKey, line: u32, elapsed: u64) {
        if !self.functions.contains_key(key) {
            self.functions.insert(key.clone(), FunctionLines::default());
        }
        if let Some(function) = self.functions.get_mut(key) {
            let entry = function.lines.entry(line).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += elapsed;
        }
    }

    /// Take an immutable copy of the current statistics
    pub fn snapshot(&self) -> StatsSnapshot {
        let timings = self
            .functions
            .iter()
            .map(|(key, function)| {
                let lines = function
                    .lines
                    .iter()
                    .map(|(&line, &(hits, time))| LineRecord { line, hits, time })
                    .collect();
                (key.clone(), lines)
            })
            .collect();

        StatsSnapshot {
            timer_unit: self.timer_unit,
            timings,
        }
    }
}

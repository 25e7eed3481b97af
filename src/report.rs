//! Report model shared by the text and HTML renderers
//!
//! Turns a [`StatsSnapshot`] plus source access into one table per
//! function: a row for every line of the function's span, with timing
//! columns filled only for lines that were observed.

use crate::heat;
use crate::source::{block_extent, SourceAccess};
use crate::stats::{total_time, FunctionKey, LineRecord, StatsSnapshot};
use crate::time_format::TimeFormatter;
use std::collections::HashMap;

/// Output document format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Plain text (default)
    #[default]
    Text,
    /// HTML with heat-colored rows
    Html,
}

/// Rendering options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportOptions {
    /// Scale times into s/ms/µs/ns instead of raw ticks
    pub human_readable: bool,
    pub format: OutputFormat,
}

/// Printed in place of a function body whose source file is missing
pub const MISSING_SOURCE_NOTICE: [&str; 3] = [
    "Are you sure you are running this program from the same directory",
    "that you ran the profiler from?",
    "Continuing without the function's contents.",
];

/// Column headers, in display order
pub const COLUMNS: [&str; 6] = ["Line #", "Hits", "Time", "Per Hit", "% Time", "Line Contents"];

/// Lay out one table row
pub fn format_columns(cells: [&str; 6]) -> String {
    format!(
        "{:>6} {:>9} {:>13} {:>10} {:>8}  {}",
        cells[0], cells[1], cells[2], cells[3], cells[4], cells[5]
    )
}

/// Table header line
pub fn header() -> String {
    format_columns(COLUMNS)
}

/// One displayed source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub line: u32,
    pub hits: String,
    pub time: String,
    pub per_hit: String,
    pub percent: String,
    pub contents: String,
}

impl Row {
    fn blank(line: u32, contents: String) -> Self {
        Self {
            line,
            hits: String::new(),
            time: String::new(),
            per_hit: String::new(),
            percent: String::new(),
            contents,
        }
    }

    pub fn render(&self) -> String {
        let line = self.line.to_string();
        format_columns([
            &line,
            &self.hits,
            &self.time,
            &self.per_hit,
            &self.percent,
            &self.contents,
        ])
    }

    /// Heat class of this row (`blank` when no time was recorded)
    pub fn heat_class(&self) -> String {
        heat::percentage_to_class(&self.percent)
    }
}

/// Table for one function
#[derive(Debug, Clone)]
pub struct FunctionReport {
    pub key: FunctionKey,
    /// Sum of all recorded line times, in ticks
    pub total_time: u64,
    /// Seconds per tick
    pub timer_unit: f64,
    /// Source file could not be read; rows carry no contents
    pub source_missing: bool,
    pub rows: Vec<Row>,
}

impl FunctionReport {
    pub fn total_seconds(&self) -> f64 {
        self.total_time as f64 * self.timer_unit
    }
}

/// Percentage cell, blank when the function has no recorded time
fn percent_cell(time: u64, total: u64) -> String {
    if total == 0 {
        return String::new();
    }
    format!("{:5.1}", 100.0 * time as f64 / total as f64)
}

/// Longest run of blank placeholder rows rendered for a missing source
pub const MAX_PLACEHOLDER_SPAN: u32 = 10_000;

/// Empty rows standing in for a missing source file
///
/// Covers `[min(first observed, start), last observed]`. Wider spans keep
/// only the start line and the observed lines.
fn placeholder_lines(key: &FunctionKey, lines: &[LineRecord]) -> Vec<(u32, String)> {
    let (Some(min), Some(max)) = (lines.first(), lines.last()) else {
        return Vec::new();
    };
    let first = min.line.min(key.start_line);
    if max.line - first < MAX_PLACEHOLDER_SPAN {
        return (first..=max.line).map(|line| (line, String::new())).collect();
    }

    tracing::warn!(
        function = %key,
        first,
        last = max.line,
        "placeholder span too wide, showing observed lines only"
    );
    let mut sparse: Vec<u32> = lines.iter().map(|l| l.line).collect();
    if key.start_line < min.line {
        sparse.insert(0, key.start_line);
    }
    sparse.into_iter().map(|line| (line, String::new())).collect()
}

/// Build the table of one function
pub fn function_report<S: SourceAccess + ?Sized>(
    key: &FunctionKey,
    lines: &[LineRecord],
    next_start: Option<u32>,
    timer_unit: f64,
    sources: &mut S,
    options: &ReportOptions,
) -> FunctionReport {
    let total = total_time(lines);
    let formatter = TimeFormatter::new(timer_unit, options.human_readable);
    let by_line: HashMap<u32, &LineRecord> = lines.iter().map(|r| (r.line, r)).collect();

    let (contents, source_missing): (Vec<(u32, String)>, bool) = match sources.lines(&key.file) {
        Some(all) => {
            let len = block_extent(&all, key.start_line, next_start);
            let first = key.start_line as usize;
            let span = if len == 0 {
                Vec::new()
            } else {
                (key.start_line..)
                    .zip(all[first - 1..first - 1 + len].iter().cloned())
                    .collect()
            };
            (span, false)
        }
        None => (placeholder_lines(key, lines), true),
    };

    let rows = contents
        .into_iter()
        .map(|(line, text)| {
            let text = text.trim_end_matches(['\n', '\r']).to_string();
            match by_line.get(&line) {
                Some(record) => Row {
                    line,
                    hits: record.hits.to_string(),
                    time: formatter.format(record.time as f64),
                    per_hit: formatter.format(record.per_hit()),
                    percent: percent_cell(record.time, total),
                    contents: text,
                },
                None => Row::blank(line, text),
            }
        })
        .collect();

    FunctionReport {
        key: key.clone(),
        total_time: total,
        timer_unit,
        source_missing,
        rows,
    }
}

/// Build tables for every function, ordered by (file, start line, name)
pub fn build_reports<S: SourceAccess + ?Sized>(
    snapshot: &StatsSnapshot,
    sources: &mut S,
    options: &ReportOptions,
) -> Vec<FunctionReport> {
    snapshot
        .timings
        .iter()
        .map(|(key, lines)| {
            let next_start = snapshot
                .timings
                .keys()
                .filter(|other| other.file == key.file && other.start_line > key.start_line)
                .map(|other| other.start_line)
                .min();
            function_report(key, lines, next_start, snapshot.timer_unit, sources, options)
        })
        .collect()
}

/// Extra header line when fixed-width times are not raw ticks
pub fn display_unit_note(timer_unit: f64, options: &ReportOptions) -> Option<String> {
    let formatter = TimeFormatter::new(timer_unit, options.human_readable);
    if options.human_readable || formatter.shows_raw_ticks() {
        None
    } else {
        Some(format!("Times shown in {}", formatter.base_label()))
    }
}

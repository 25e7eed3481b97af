//! Plain-text report
//!
//! Source lines side by side with hits, total time, time per hit and share
//! of the function's time.

use crate::report::{self, FunctionReport, ReportOptions, MISSING_SOURCE_NOTICE};
use crate::source::SourceAccess;
use crate::stats::StatsSnapshot;
use crate::time_format::format_g;
use std::io::{self, Write};

/// Write the text section for one function
pub fn write_function<W: Write + ?Sized>(out: &mut W, function: &FunctionReport) -> io::Result<()> {
    writeln!(out, "File: {}", function.key.file)?;
    writeln!(
        out,
        "Function: {} at line {}",
        function.key.name, function.key.start_line
    )?;
    writeln!(out, "Total time: {} s", format_g(function.total_seconds()))?;

    if function.source_missing {
        writeln!(out)?;
        writeln!(out, "Could not find file {}", function.key.file)?;
        for line in MISSING_SOURCE_NOTICE {
            writeln!(out, "{}", line)?;
        }
    }

    let header = report::header();
    writeln!(out)?;
    writeln!(out, "{}", header)?;
    writeln!(out, "{}", "=".repeat(header.chars().count()))?;
    for row in &function.rows {
        writeln!(out, "{}", row.render())?;
    }
    writeln!(out)?;
    Ok(())
}

/// Write the complete text report
pub fn write_text<W, S>(
    out: &mut W,
    snapshot: &StatsSnapshot,
    sources: &mut S,
    options: &ReportOptions,
) -> io::Result<()>
where
    W: Write + ?Sized,
    S: SourceAccess + ?Sized,
{
    writeln!(out, "Timer unit: {} s", format_g(snapshot.timer_unit))?;
    if let Some(note) = report::display_unit_note(snapshot.timer_unit, options) {
        writeln!(out, "{}", note)?;
    }
    writeln!(out)?;

    for function in report::build_reports(snapshot, sources, options) {
        write_function(out, &function)?;
    }
    Ok(())
}

/// Render the text report into a string
pub fn to_text<S: SourceAccess + ?Sized>(
    snapshot: &StatsSnapshot,
    sources: &mut S,
    options: &ReportOptions,
) -> String {
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail
    let _ = write_text(&mut buffer, snapshot, sources, options);
    String::from_utf8_lossy(&buffer).into_owned()
}

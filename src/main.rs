use anyhow::{Context, Result};
use clap::Parser;
use lineprof::cli::Cli;
use lineprof::html_output::HtmlOutput;
use lineprof::persistence;
use lineprof::report::{OutputFormat, ReportOptions};
use lineprof::source::SourceCache;
use lineprof::stats::StatsSnapshot;
use lineprof::text_output;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn write_html_report(snapshot: &StatsSnapshot, options: &ReportOptions, path: &Path) -> Result<()> {
    let mut sources = SourceCache::new();
    let html = HtmlOutput::new(snapshot, &mut sources, options).to_html();

    let file = File::create(path)
        .with_context(|| format!("Failed to create HTML report {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(html.as_bytes())?;
    writer.flush()?;

    tracing::info!(path = %path.display(), "wrote HTML report");
    Ok(())
}

fn write_text_report(snapshot: &StatsSnapshot, options: &ReportOptions) -> Result<()> {
    let mut sources = SourceCache::new();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    text_output::write_text(&mut out, snapshot, &mut sources, options)?;
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let snapshot = persistence::load(&args.stats_file)
        .with_context(|| format!("Failed to load stats file {}", args.stats_file.display()))?;
    tracing::debug!(functions = snapshot.len(), unit = snapshot.timer_unit, "snapshot loaded");
    if snapshot.is_empty() {
        tracing::warn!(path = %args.stats_file.display(), "stats file contains no functions");
    }

    let options = args.report_options();
    match options.format {
        OutputFormat::Html => write_html_report(&snapshot, &options, &args.html_path()),
        OutputFormat::Text => write_text_report(&snapshot, &options),
    }
}

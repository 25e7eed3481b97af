//! CLI argument parsing for lineprof

use crate::report::{OutputFormat, ReportOptions};
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lineprof")]
#[command(version)]
#[command(about = "Render line-by-line execution statistics", long_about = None)]
pub struct Cli {
    /// Stats file written by the profiler (.lprof/.json, or .msgpack/.mpk)
    #[arg(value_name = "STATS_FILE")]
    pub stats_file: PathBuf,

    /// Show times with adaptive units (ns, µs, ms, s)
    #[arg(short = 'H', long = "human-readable")]
    pub human_readable: bool,

    /// Write a heat-mapped HTML report to <STATS_FILE>.html instead of text
    #[arg(short = 'm', long = "output-html")]
    pub output_html: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            human_readable: self.human_readable,
            format: if self.output_html {
                OutputFormat::Html
            } else {
                OutputFormat::Text
            },
        }
    }

    /// Destination of the HTML report: the stats path with `.html` appended
    pub fn html_path(&self) -> PathBuf {
        let mut path = OsString::from(self.stats_file.as_os_str());
        path.push(".html");
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_stats_file() {
        let cli = Cli::parse_from(["lineprof", "profile.lprof"]);
        assert_eq!(cli.stats_file, PathBuf::from("profile.lprof"));
        assert!(!cli.human_readable);
        assert!(!cli.output_html);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_requires_stats_file() {
        let result = Cli::try_parse_from(["lineprof"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rejects_extra_positional() {
        let result = Cli::try_parse_from(["lineprof", "a.lprof", "b.lprof"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_human_readable_flags() {
        let cli = Cli::parse_from(["lineprof", "-H", "p.lprof"]);
        assert!(cli.human_readable);

        let cli = Cli::parse_from(["lineprof", "p.lprof", "--human-readable"]);
        assert!(cli.human_readable);
    }

    #[test]
    fn test_cli_output_html_flags() {
        let cli = Cli::parse_from(["lineprof", "-m", "p.lprof"]);
        assert!(cli.output_html);
        assert_eq!(cli.report_options().format, OutputFormat::Html);

        let cli = Cli::parse_from(["lineprof", "--output-html", "p.lprof"]);
        assert!(cli.output_html);
    }

    #[test]
    fn test_cli_default_report_options() {
        let cli = Cli::parse_from(["lineprof", "p.lprof"]);
        assert_eq!(cli.report_options(), ReportOptions::default());
    }

    #[test]
    fn test_cli_html_path_appends_extension() {
        let cli = Cli::parse_from(["lineprof", "out/run.lprof"]);
        assert_eq!(cli.html_path(), PathBuf::from("out/run.lprof.html"));
    }

    #[test]
    fn test_cli_debug_flag() {
        let cli = Cli::parse_from(["lineprof", "--debug", "p.lprof"]);
        assert!(cli.debug);
    }
}

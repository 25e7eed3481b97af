//! HTML output format for line reports
//!
//! Same tables as the text report inside `<pre>` blocks, with every row
//! wrapped in a span whose class is the row's heat bucket.

use crate::heat;
use crate::report::{self, FunctionReport, ReportOptions, MISSING_SOURCE_NOTICE};
use crate::source::SourceAccess;
use crate::stats::StatsSnapshot;
use crate::time_format::format_g;

/// HTML report builder
#[derive(Debug)]
pub struct HtmlOutput {
    timer_unit: f64,
    unit_note: Option<String>,
    functions: Vec<FunctionReport>,
}

impl HtmlOutput {
    /// Build the report for a snapshot
    pub fn new<S: SourceAccess + ?Sized>(
        snapshot: &StatsSnapshot,
        sources: &mut S,
        options: &ReportOptions,
    ) -> Self {
        Self {
            timer_unit: snapshot.timer_unit,
            unit_note: report::display_unit_note(snapshot.timer_unit, options),
            functions: report::build_reports(snapshot, sources, options),
        }
    }

    /// Escape HTML special characters to prevent XSS
    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;")
    }

    /// Embedded heat palette
    fn generate_styles() -> String {
        let mut css = String::from("\n");
        css.push_str("        pre { font-family: monospace; }\n");
        for rule in heat::palette_css().lines() {
            css.push_str("        ");
            css.push_str(rule);
            css.push('\n');
        }
        css.push_str("    ");
        css
    }

    fn render_function(function: &FunctionReport) -> String {
        let mut html = String::new();

        html.push_str(&format!(
            "    <h2>{}()</h2>\n",
            Self::escape_html(&function.key.name)
        ));
        html.push_str(&format!(
            "    <p>File: {}:{}</p>\n",
            Self::escape_html(&function.key.file),
            function.key.start_line
        ));
        html.push_str(&format!(
            "    <p>Total time: {} s</p>\n",
            format_g(function.total_seconds())
        ));

        if function.source_missing {
            html.push_str("    <p class=\"notice\">");
            html.push_str(&format!(
                "Could not find file {}<br>\n",
                Self::escape_html(&function.key.file)
            ));
            html.push_str(&MISSING_SOURCE_NOTICE.join("<br>\n"));
            html.push_str("</p>\n");
        }

        let header = report::header();
        html.push_str("<pre>\n");
        html.push_str(&Self::escape_html(&header));
        html.push('\n');
        html.push_str(&"=".repeat(header.chars().count()));
        html.push('\n');
        for row in &function.rows {
            html.push_str(&format!(
                "<span class=\"{}\">{}</span>\n",
                row.heat_class(),
                Self::escape_html(&row.render())
            ));
        }
        html.push_str("</pre>\n");

        html
    }

    /// Generate complete HTML document
    pub fn to_html(&self) -> String {
        let mut html = String::new();

        html.push_str("<!DOCTYPE html>\n");
        html.push_str("<html lang=\"en\">\n");

        html.push_str("<head>\n");
        html.push_str("    <meta charset=\"UTF-8\">\n");
        html.push_str("    <title>Line Profile Report</title>\n");
        html.push_str("    <style type=\"text/css\">");
        html.push_str(&Self::generate_styles());
        html.push_str("</style>\n");
        html.push_str("</head>\n");

        html.push_str("<body>\n");
        html.push_str(&format!(
            "    <p>Timer unit: {} s</p>\n",
            format_g(self.timer_unit)
        ));
        if let Some(note) = &self.unit_note {
            html.push_str(&format!("    <p>{}</p>\n", Self::escape_html(note)));
        }

        for function in &self.functions {
            html.push_str(&Self::render_function(function));
        }

        html.push_str("</body>\n");
        html.push_str("</html>\n");

        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::stats::{FunctionKey, LineRecord};

    fn snapshot() -> StatsSnapshot {
        let mut snapshot = StatsSnapshot::new(1e-6);
        snapshot.timings.insert(
            FunctionKey::new("a.src", 1, "f"),
            vec![
                LineRecord { line: 1, hits: 1, time: 5 },
                LineRecord { line: 2, hits: 4, time: 95 },
            ],
        );
        snapshot
    }

    fn sources() -> MemorySource {
        let mut sources = MemorySource::new();
        sources.insert("a.src", "fn f() {\n    if a < b && c { x(\"<b>\") }\n}\n");
        sources
    }

    fn render(snapshot: &StatsSnapshot) -> String {
        HtmlOutput::new(snapshot, &mut sources(), &ReportOptions::default()).to_html()
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(HtmlOutput::escape_html("<script>"), "&lt;script&gt;");
        assert_eq!(HtmlOutput::escape_html("a&b"), "a&amp;b");
        assert_eq!(HtmlOutput::escape_html("\"test\""), "&quot;test&quot;");
        assert_eq!(HtmlOutput::escape_html("'test'"), "&#39;test&#39;");
    }

    #[test]
    fn test_html_output_basic_structure() {
        let html = render(&snapshot());

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<head>"));
        assert!(html.contains("<body>"));
        assert!(html.contains("<p>Timer unit: 1e-06 s</p>"));
        assert!(html.contains("<h2>f()</h2>"));
        assert!(html.contains("<p>File: a.src:1</p>"));
        assert!(html.ends_with("</html>\n"));
    }

    #[test]
    fn test_palette_emitted_once() {
        let mut snapshot = snapshot();
        snapshot
            .timings
            .insert(FunctionKey::new("a.src", 3, "g"), vec![LineRecord { line: 3, hits: 1, time: 1 }]);
        let html = render(&snapshot);

        assert_eq!(html.matches("span.p0 ").count(), 1);
        assert_eq!(html.matches("span.p10").count(), 1);
        assert_eq!(html.matches("<pre>").count(), 2);
    }

    #[test]
    fn test_rows_carry_heat_classes() {
        let html = render(&snapshot());

        // 5% -> p2, 95% -> p10, closing brace has no timing
        assert!(html.contains("<span class=\"p2\">     1"));
        assert!(html.contains("<span class=\"p10\">     2"));
        assert!(html.contains("<span class=\"blank\">     3"));
    }

    #[test]
    fn test_source_text_is_escaped() {
        let html = render(&snapshot());
        assert!(html.contains("a &lt; b &amp;&amp; c"));
        assert!(!html.contains("x(\"<b>\")"));
    }

    #[test]
    fn test_missing_source_degrades() {
        let mut snapshot = StatsSnapshot::new(1e-6);
        snapshot.timings.insert(
            FunctionKey::new("gone.src", 4, "h"),
            vec![LineRecord { line: 5, hits: 1, time: 1 }],
        );
        let html = render(&snapshot);

        assert!(html.contains("Could not find file gone.src"));
        assert!(html.contains("<span class=\"p10\">     5"));
        assert!(html.contains("<span class=\"blank\">     4"));
    }
}

//! Source access for report rendering
//!
//! Reports show each function's source next to its timings. Files are read
//! once per path and cached; a missing file is cached as missing too.
//!
//! The displayed span of a function is found by [`block_extent`], an
//! approximation that handles brace-delimited and indentation-delimited
//! bodies and otherwise runs up to the next known function.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// Lines of one source file, without line terminators
pub type SourceLines = Rc<[String]>;

/// Read access to source files by path
pub trait SourceAccess {
    /// All lines of `path`, or `None` when the file cannot be read
    fn lines(&mut self, path: &str) -> Option<SourceLines>;
}

/// Reads source files from disk, caching by path
#[derive(Debug, Default)]
pub struct SourceCache {
    files: HashMap<String, Option<SourceLines>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct paths looked up so far
    pub fn cached_paths(&self) -> usize {
        self.files.len()
    }

    fn read(path: &str) -> Option<SourceLines> {
        match fs::read(Path::new(path)) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                Some(text.lines().map(str::to_string).collect())
            }
            Err(e) => {
                tracing::warn!(path, error = %e, "source file unavailable");
                None
            }
        }
    }
}

impl SourceAccess for SourceCache {
    fn lines(&mut self, path: &str) -> Option<SourceLines> {
        self.files
            .entry(path.to_string())
            .or_insert_with(|| Self::read(path))
            .clone()
    }
}

/// In-memory sources keyed by path
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    files: HashMap<String, SourceLines>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, text: &str) {
        self.files
            .insert(path.into(), text.lines().map(str::to_string).collect());
    }
}

impl SourceAccess for MemorySource {
    fn lines(&mut self, path: &str) -> Option<SourceLines> {
        self.files.get(path).cloned()
    }
}

/// Signature lines scanned before giving up on finding a body
const MAX_SIGNATURE_LINES: usize = 16;

/// Number of lines in the function starting at `start_line` (1-based)
///
/// `next_start` is the start line of the next known function in the same
/// file, used when no body delimiters are found.
pub fn block_extent(lines: &[String], start_line: u32, next_start: Option<u32>) -> usize {
    let start = start_line as usize;
    if start == 0 || start > lines.len() {
        return 0;
    }
    let body = &lines[start - 1..];

    match delimited_extent(body) {
        Some(len) => len,
        None => fallback_extent(body, start_line, next_start),
    }
}

enum BodyStyle {
    /// Closing brace found on this line (0-based, relative to the start)
    Braces(usize),
    /// Signature ends with ':' on this line
    Indented(usize),
}

fn delimited_extent(body: &[String]) -> Option<usize> {
    match body_style(body)? {
        BodyStyle::Braces(end) => Some(end + 1),
        BodyStyle::Indented(header_end) => Some(indented_extent(body, header_end)),
    }
}

fn body_style(body: &[String]) -> Option<BodyStyle> {
    let mut depth: i64 = 0;
    let mut opened = false;

    for (i, line) in body.iter().enumerate() {
        let code = strip_literals_and_comments(line);
        for ch in code.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' if opened => {
                    depth -= 1;
                    if depth == 0 {
                        // `def f(x={}):` is still a colon signature
                        if code.trim_end().ends_with(':') {
                            return Some(BodyStyle::Indented(i));
                        }
                        return Some(BodyStyle::Braces(i));
                    }
                }
                ';' if !opened => return None,
                _ => {}
            }
        }

        if !opened {
            if code.trim_end().ends_with(':') {
                return Some(BodyStyle::Indented(i));
            }
            if i + 1 >= MAX_SIGNATURE_LINES {
                return None;
            }
        }
    }
    None
}

fn indentation(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 8 } else { 1 })
        .sum()
}

fn indented_extent(body: &[String], header_end: usize) -> usize {
    let base = indentation(&body[0]);
    let mut last = header_end;

    for (i, line) in body.iter().enumerate().skip(header_end + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if indentation(line) <= base {
            break;
        }
        last = i;
    }
    last + 1
}

fn fallback_extent(body: &[String], start_line: u32, next_start: Option<u32>) -> usize {
    let limit = match next_start {
        Some(next) if next > start_line => ((next - start_line) as usize).min(body.len()),
        _ => body.len(),
    };
    let trailing_blank = body[..limit]
        .iter()
        .rev()
        .take_while(|line| line.trim().is_empty())
        .count();
    (limit - trailing_blank).max(1)
}

/// Replace string/char literal contents and drop comments
fn strip_literals_and_comments(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '#' => break,
            '/' if chars.get(i + 1) == Some(&'/') => break,
            '"' => {
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                out.push_str("\"\"");
            }
            '\'' => {
                // 'x' and '\n' are literals; 'a in `&'a str` is a lifetime
                if chars.get(i + 1) == Some(&'\\') {
                    let close = (i + 2..chars.len().min(i + 12)).find(|&j| chars[j] == '\'');
                    if let Some(close) = close {
                        i = close;
                        out.push_str("''");
                    }
                } else if chars.get(i + 2) == Some(&'\'') {
                    i += 2;
                    out.push_str("''");
                }
            }
            _ => out.push(ch),
        }
        i += 1;
    }
    out
}

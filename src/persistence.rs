//! Stats file persistence
//!
//! Snapshots are stored with an explicit, versioned schema:
//!
//! ```json
//! {
//!   "version": 1,
//!   "timer_unit": 1e-6,
//!   "functions": [
//!     { "file": "a.src", "start_line": 10, "name": "f",
//!       "lines": [[10, 3, 30], [11, 3, 60]] }
//!   ]
//! }
//! ```
//!
//! JSON is the default encoding. Paths ending in `.msgpack` or `.mpk` use
//! MessagePack with the same schema. Loading validates every invariant of
//! the snapshot before returning it.

use crate::stats::{FunctionKey, LineRecord, StatsSnapshot};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

/// Current schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from reading or writing stats files
#[derive(Error, Debug)]
pub enum StatsFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid stats JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to encode MessagePack: {0}")]
    MessagePackEncode(#[from] rmp_serde::encode::Error),

    #[error("Invalid stats MessagePack: {0}")]
    MessagePackDecode(#[from] rmp_serde::decode::Error),

    #[error("Unsupported stats file version: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Invalid stats file: {0}")]
    Invalid(String),
}

/// Result type for persistence operations
pub type Result<T> = std::result::Result<T, StatsFileError>;

/// On-disk encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    MessagePack,
}

impl Encoding {
    /// Pick the encoding from a file extension
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("msgpack") | Some("mpk") => Encoding::MessagePack,
            _ => Encoding::Json,
        }
    }
}

/// Persisted snapshot (schema v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsFile {
    pub version: u32,
    /// Seconds per tick
    pub timer_unit: f64,
    pub functions: Vec<FunctionEntry>,
}

/// One function in a stats file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionEntry {
    pub file: String,
    pub start_line: u32,
    pub name: String,
    /// `(line, hits, time_ticks)` in ascending line order
    pub lines: Vec<(u32, u64, u64)>,
}

impl From<&StatsSnapshot> for StatsFile {
    fn from(snapshot: &StatsSnapshot) -> Self {
        let functions = snapshot
            .timings
            .iter()
            .map(|(key, lines)| FunctionEntry {
                file: key.file.clone(),
                start_line: key.start_line,
                name: key.name.clone(),
                lines: lines.iter().map(|l| (l.line, l.hits, l.time)).collect(),
            })
            .collect();

        Self {
            version: SCHEMA_VERSION,
            timer_unit: snapshot.timer_unit,
            functions,
        }
    }
}

impl StatsFile {
    /// Validate and convert into a snapshot
    pub fn into_snapshot(self) -> Result<StatsSnapshot> {
        if self.version != SCHEMA_VERSION {
            return Err(StatsFileError::VersionMismatch {
                expected: SCHEMA_VERSION,
                found: self.version,
            });
        }
        if !self.timer_unit.is_finite() || self.timer_unit <= 0.0 {
            return Err(StatsFileError::Invalid(format!(
                "timer unit must be a positive number, got {}",
                self.timer_unit
            )));
        }

        let mut snapshot = StatsSnapshot::new(self.timer_unit);
        for function in self.functions {
            let key = FunctionKey::new(function.file, function.start_line, function.name);
            let lines = validate_lines(&key, &function.lines)?;
            if snapshot.timings.insert(key.clone(), lines).is_some() {
                return Err(StatsFileError::Invalid(format!(
                    "duplicate function {}",
                    key
                )));
            }
        }
        Ok(snapshot)
    }
}

fn validate_lines(key: &FunctionKey, raw: &[(u32, u64, u64)]) -> Result<Vec<LineRecord>> {
    let mut previous: Option<u32> = None;
    raw.iter()
        .map(|&(line, hits, time)| {
            if hits == 0 {
                return Err(StatsFileError::Invalid(format!(
                    "{}: line {} has zero hits",
                    key, line
                )));
            }
            if previous.is_some_and(|p| p >= line) {
                return Err(StatsFileError::Invalid(format!(
                    "{}: line numbers must be strictly ascending at line {}",
                    key, line
                )));
            }
            previous = Some(line);
            Ok(LineRecord { line, hits, time })
        })
        .collect()
}

/// Encode a snapshot into `writer`
pub fn write_snapshot<W: Write>(
    snapshot: &StatsSnapshot,
    writer: &mut W,
    encoding: Encoding,
) -> Result<()> {
    let file = StatsFile::from(snapshot);
    match encoding {
        Encoding::Json => {
            serde_json::to_writer_pretty(&mut *writer, &file)?;
            writer.write_all(b"\n")?;
        }
        Encoding::MessagePack => {
            rmp_serde::encode::write_named(&mut *writer, &file)?;
        }
    }
    Ok(())
}

/// Decode a snapshot from `reader`
pub fn read_snapshot<R: Read>(reader: R, encoding: Encoding) -> Result<StatsSnapshot> {
    let file: StatsFile = match encoding {
        Encoding::Json => serde_json::from_reader(reader)?,
        Encoding::MessagePack => rmp_serde::from_read(reader)?,
    };
    file.into_snapshot()
}

/// Save a snapshot to `path`
pub fn save(snapshot: &StatsSnapshot, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let encoding = Encoding::for_path(path);
    let mut writer = BufWriter::new(File::create(path)?);
    write_snapshot(snapshot, &mut writer, encoding)?;
    writer.flush()?;

    tracing::debug!(
        path = %path.display(),
        functions = snapshot.len(),
        ?encoding,
        "saved stats file"
    );
    Ok(())
}

/// Load a snapshot from `path`
pub fn load(path: impl AsRef<Path>) -> Result<StatsSnapshot> {
    let path = path.as_ref();
    let encoding = Encoding::for_path(path);
    let reader = BufReader::new(File::open(path)?);
    let snapshot = read_snapshot(reader, encoding)?;

    tracing::debug!(
        path = %path.display(),
        functions = snapshot.len(),
        ?encoding,
        "loaded stats file"
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn example() -> StatsSnapshot {
        let mut snapshot = StatsSnapshot::new(1e-6);
        snapshot.timings.insert(
            FunctionKey::new("a.src", 10, "f"),
            vec![
                LineRecord { line: 10, hits: 3, time: 30 },
                LineRecord { line: 11, hits: 3, time: 60 },
                LineRecord { line: 12, hits: 1, time: 10 },
            ],
        );
        snapshot.timings.insert(FunctionKey::new("b.src", 1, "g"), vec![]);
        snapshot
    }

    #[test]
    fn test_json_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profile.lprof");
        save(&example(), &path).unwrap();
        assert_eq!(load(&path).unwrap(), example());
    }

    #[test]
    fn test_msgpack_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profile.msgpack");
        save(&example(), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(serde_json::from_slice::<serde_json::Value>(&bytes).is_err());
        assert_eq!(load(&path).unwrap(), example());
    }

    #[test]
    fn test_json_schema_shape() {
        let mut buffer = Vec::new();
        write_snapshot(&example(), &mut buffer, Encoding::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

        assert_eq!(value["version"], 1);
        assert_eq!(value["timer_unit"], 1e-6);
        assert_eq!(value["functions"][0]["file"], "a.src");
        assert_eq!(value["functions"][0]["start_line"], 10);
        assert_eq!(value["functions"][0]["lines"][1], serde_json::json!([11, 3, 60]));
    }

    #[test]
    fn test_version_mismatch() {
        let json = r#"{"version": 2, "timer_unit": 1e-6, "functions": []}"#;
        let err = read_snapshot(json.as_bytes(), Encoding::Json).unwrap_err();
        assert!(matches!(
            err,
            StatsFileError::VersionMismatch { expected: 1, found: 2 }
        ));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let err = read_snapshot(&b"not a stats file"[..], Encoding::Json).unwrap_err();
        assert!(err.to_string().contains("Invalid stats JSON"));
    }

    #[test]
    fn test_invalid_timer_unit() {
        let json = r#"{"version": 1, "timer_unit": 0.0, "functions": []}"#;
        let err = read_snapshot(json.as_bytes(), Encoding::Json).unwrap_err();
        assert!(err.to_string().contains("timer unit"));
    }

    #[test]
    fn test_unsorted_lines_rejected() {
        let json = r#"{"version": 1, "timer_unit": 1e-6, "functions": [
            {"file": "a.src", "start_line": 1, "name": "f", "lines": [[3, 1, 1], [2, 1, 1]]}
        ]}"#;
        let err = read_snapshot(json.as_bytes(), Encoding::Json).unwrap_err();
        assert!(err.to_string().contains("strictly ascending"));
    }

    #[test]
    fn test_zero_hits_rejected() {
        let json = r#"{"version": 1, "timer_unit": 1e-6, "functions": [
            {"file": "a.src", "start_line": 1, "name": "f", "lines": [[1, 0, 0]]}
        ]}"#;
        let err = read_snapshot(json.as_bytes(), Encoding::Json).unwrap_err();
        assert!(err.to_string().contains("zero hits"));
    }

    #[test]
    fn test_duplicate_function_rejected() {
        let json = r#"{"version": 1, "timer_unit": 1e-6, "functions": [
            {"file": "a.src", "start_line": 1, "name": "f", "lines": []},
            {"file": "a.src", "start_line": 1, "name": "f", "lines": []}
        ]}"#;
        let err = read_snapshot(json.as_bytes(), Encoding::Json).unwrap_err();
        assert!(err.to_string().contains("duplicate function"));
    }

    #[test]
    fn test_missing_file() {
        let err = load("/nonexistent/profile.lprof").unwrap_err();
        assert!(matches!(err, StatsFileError::Io(_)));
    }

    #[test]
    fn test_encoding_for_path() {
        assert_eq!(Encoding::for_path(Path::new("x.lprof")), Encoding::Json);
        assert_eq!(Encoding::for_path(Path::new("x.json")), Encoding::Json);
        assert_eq!(Encoding::for_path(Path::new("x.mpk")), Encoding::MessagePack);
        assert_eq!(Encoding::for_path(Path::new("x.msgpack")), Encoding::MessagePack);
    }
}

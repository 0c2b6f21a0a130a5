//! Reading a directory of workout log files into typed set records.
//!
//! One file per training session, named `<session-timestamp>.txt`. Each line
//! holds one logged set: `<start> <end> <exercise> <count>`, whitespace
//! separated, timestamps in `YYYY-MM-DD-HH-MM-SS`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Timestamp format used for file names and the start/end columns.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// A malformed log directory aborts the whole load; there is no partial
/// dataset. Every variant names the offending file (and line where there
/// is one) so the message points straight at the bad input.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{file}: file name is not a {TIMESTAMP_FORMAT} session timestamp")]
    BadSessionName { file: String },
    #[error("{file}:{line}: expected 4 fields, found {found}")]
    FieldCount {
        file: String,
        line: usize,
        found: usize,
    },
    #[error("{file}:{line}: invalid timestamp {value:?}")]
    BadTimestamp {
        file: String,
        line: usize,
        value: String,
    },
    #[error("{file}:{line}: invalid repetition count {value:?}")]
    BadCount {
        file: String,
        line: usize,
        value: String,
    },
}

/// One line of one log file: a single set of an exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRecord {
    /// Session identifier, parsed from the file stem.
    pub training_id: NaiveDateTime,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub exercise: String,
    pub count: u32,
}

/// Read every `*.txt` file in `dir` and return one record per line.
///
/// Files are visited in name order so repeated loads of the same directory
/// yield the same record sequence. An empty directory is not an error.
pub fn read_logs(dir: &Path) -> Result<Vec<SetRecord>, ParseError> {
    let io_err = |e| ParseError::Io {
        path: dir.to_path_buf(),
        source: e,
    };
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(&io_err)? {
        let path = entry.map_err(&io_err)?.path();
        let is_log = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("txt"))
            .unwrap_or(false);
        if is_log && path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut records = Vec::new();
    for path in &files {
        parse_log_file(path, &mut records)?;
    }
    log::info!(
        "parsed {} sets from {} session files in {}",
        records.len(),
        files.len(),
        dir.display()
    );
    Ok(records)
}

fn parse_log_file(path: &Path, out: &mut Vec<SetRecord>) -> Result<(), ParseError> {
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let training_id = NaiveDateTime::parse_from_str(&stem, TIMESTAMP_FORMAT)
        .map_err(|_| ParseError::BadSessionName { file: file.clone() })?;

    let text = std::fs::read_to_string(path).map_err(|e| ParseError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    for (idx, raw_line) in text.lines().enumerate() {
        let line = idx + 1;
        if raw_line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = raw_line.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(ParseError::FieldCount {
                file,
                line,
                found: fields.len(),
            });
        }
        let timestamp = |value: &str| {
            NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|_| {
                ParseError::BadTimestamp {
                    file: file.clone(),
                    line,
                    value: value.to_string(),
                }
            })
        };
        let start = timestamp(fields[0])?;
        let end = timestamp(fields[1])?;
        let count: u32 = fields[3].parse().map_err(|_| ParseError::BadCount {
            file: file.clone(),
            line,
            value: fields[3].to_string(),
        })?;
        out.push(SetRecord {
            training_id,
            start,
            end,
            exercise: fields[2].to_string(),
            count,
        });
    }
    Ok(())
}

//! Append-only JSONL turn log
//!
//! One serialized block per turn, success or failure, always parseable as a
//! single JSON object per line.

use crate::turn::TurnResult;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Turn log failure
#[derive(Debug, Error)]
pub enum TurnLogError {
    /// Could not open or write the log file
    #[error("turn log io error: {0}")]
    Io(#[from] std::io::Error),

    /// Could not serialize the entry
    #[error("turn log serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One log line: timestamp plus the full turn result
#[derive(Debug, Serialize)]
pub struct TurnLogEntry<'a> {
    /// Unix seconds when the turn finished
    pub timestamp: u64,
    /// The complete turn result, including the raw utterance
    #[serde(flatten)]
    pub result: &'a TurnResult,
}

/// Append-only JSONL writer
pub struct TurnLog {
    path: PathBuf,
}

impl TurnLog {
    /// Log to the given file, created on first append
    pub fn new(path: impl Into<PathBuf>) -> TurnLog {
        TurnLog { path: path.into() }
    }

    /// Where entries are written
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a single line
    pub fn append(&self, timestamp: u64, result: &TurnResult) -> Result<(), TurnLogError> {
        let entry = TurnLogEntry { timestamp, result };
        let line = serde_json::to_string(&entry)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

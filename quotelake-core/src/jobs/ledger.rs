//! Job-run ledger: JSONL append-only record of run state transitions.
//!
//! Each start appends a `RUNNING` line and each completion a `SUCCEEDED` or `FAILED` line
//! for the same run id. The current state of a run is its last line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use super::{JobArguments, JobError, JobRunId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Running,
    Succeeded,
    Failed,
}

/// One ledger line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: JobRunId,
    pub job_name: String,
    pub state: RunState,
    pub arguments: JobArguments,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub struct RunLedger {
    path: PathBuf,
}

impl RunLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn err(&self, source: io::Error) -> JobError {
        JobError::Ledger {
            path: self.path.display().to_string(),
            source,
        }
    }

    /// Append one record as a single line.
    pub fn append(&self, record: &RunRecord) -> Result<(), JobError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.err(e))?;
        }
        let mut line = serde_json::to_string(record)
            .map_err(|e| self.err(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.err(e))?;
        file.write_all(line.as_bytes()).map_err(|e| self.err(e))
    }

    /// All records in append order. A missing ledger is empty; unparseable lines are skipped.
    pub fn records(&self) -> Result<Vec<RunRecord>, JobError> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.err(e)),
        };

        let mut records = Vec::new();
        for line in io::BufReader::new(file).lines() {
            let line = line.map_err(|e| self.err(e))?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(record) = serde_json::from_str::<RunRecord>(&line) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Latest record per run id.
    pub fn latest(&self) -> Result<BTreeMap<JobRunId, RunRecord>, JobError> {
        let mut latest = BTreeMap::new();
        for record in self.records()? {
            latest.insert(record.run_id.clone(), record);
        }
        Ok(latest)
    }
}

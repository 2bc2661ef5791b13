//! Job runner seam: the trait the job starter calls, argument handling, and a local
//! runner that executes jobs in-process and keeps a run ledger.

pub mod args;
pub mod ledger;
pub mod local;

pub use args::{parse_argv, resolve_options, JobArguments};
pub use ledger::{RunLedger, RunRecord, RunState};
pub use local::{JobHandler, LocalJobRunner};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Argument carrying the raw object that triggered the run.
pub const SOURCE_PATH_ARG: &str = "--s3_source_path";
/// Argument naming the job itself, injected by the runner.
pub const JOB_NAME_ARG: &str = "--JOB_NAME";

/// Identifier returned by a successful start.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobRunId(pub String);

impl fmt::Display for JobRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("job '{name}' does not exist")]
    JobNotFound { name: String },

    #[error("invalid job arguments: {0}")]
    InvalidArguments(String),

    #[error("job runner unavailable: {0}")]
    Unavailable(String),

    #[error("run ledger error at {path}: {source}")]
    Ledger {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Starts runs of named jobs.
pub trait JobRunner: Send + Sync {
    /// Start one run of `job_name` with `arguments` (`--NAME` keys) and return its id.
    fn start_job_run(
        &self,
        job_name: &str,
        arguments: &JobArguments,
    ) -> Result<JobRunId, JobError>;
}

//! In-process job runner.
//!
//! Starting a run resolves the job definition, merges its default arguments under the
//! run's arguments, records the run as `RUNNING`, executes the handler and records the
//! outcome. A failing job does not fail the start: start and completion are separate
//! events, and the failure is visible in the ledger.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, info};

use super::{
    JobArguments, JobError, JobRunId, JobRunner, RunLedger, RunRecord, RunState, JOB_NAME_ARG,
};
use crate::config::JobDefinition;
use crate::error::PipelineError;

static RUN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Executes a job body with fully merged arguments; returns a one-line summary.
pub trait JobHandler: Send + Sync {
    fn run(&self, arguments: &JobArguments) -> Result<String, PipelineError>;
}

pub struct LocalJobRunner<'a> {
    jobs: BTreeMap<String, JobDefinition>,
    handler: &'a dyn JobHandler,
    ledger: RunLedger,
}

impl<'a> LocalJobRunner<'a> {
    pub fn new(
        jobs: BTreeMap<String, JobDefinition>,
        handler: &'a dyn JobHandler,
        ledger: RunLedger,
    ) -> Self {
        Self {
            jobs,
            handler,
            ledger,
        }
    }

    pub fn ledger(&self) -> &RunLedger {
        &self.ledger
    }

    fn next_run_id(job_name: &str, arguments: &JobArguments) -> JobRunId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(job_name.as_bytes());
        for (k, v) in arguments {
            hasher.update(k.as_bytes());
            hasher.update(b"\0");
            hasher.update(v.as_bytes());
            hasher.update(b"\0");
        }
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        hasher.update(&nanos.to_le_bytes());
        hasher.update(&std::process::id().to_le_bytes());
        hasher.update(&RUN_COUNTER.fetch_add(1, Ordering::Relaxed).to_le_bytes());
        JobRunId(format!("jr_{}", hasher.finalize().to_hex()))
    }

    fn record(
        &self,
        run_id: &JobRunId,
        job_name: &str,
        state: RunState,
        arguments: &JobArguments,
        message: Option<String>,
    ) -> Result<(), JobError> {
        self.ledger.append(&RunRecord {
            run_id: run_id.clone(),
            job_name: job_name.to_string(),
            state,
            arguments: arguments.clone(),
            at: Utc::now(),
            message,
        })
    }
}

impl JobRunner for LocalJobRunner<'_> {
    fn start_job_run(
        &self,
        job_name: &str,
        arguments: &JobArguments,
    ) -> Result<JobRunId, JobError> {
        let definition = self.jobs.get(job_name).ok_or_else(|| JobError::JobNotFound {
            name: job_name.to_string(),
        })?;

        let mut merged = definition.default_arguments.clone();
        merged.extend(arguments.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged.insert(JOB_NAME_ARG.to_string(), job_name.to_string());

        let run_id = Self::next_run_id(job_name, &merged);
        self.record(&run_id, job_name, RunState::Running, &merged, None)?;
        info!(%job_name, %run_id, "job run started");

        match self.handler.run(&merged) {
            Ok(summary) => {
                info!(%run_id, %summary, "job run succeeded");
                self.record(&run_id, job_name, RunState::Succeeded, &merged, Some(summary))?;
            }
            Err(e) => {
                error!(%run_id, error = %e, "job run failed");
                self.record(&run_id, job_name, RunState::Failed, &merged, Some(e.to_string()))?;
            }
        }

        Ok(run_id)
    }
}

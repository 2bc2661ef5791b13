//! Job starter: one storage notification in, one transform run started.
//!
//! Notifications can be delivered more than once, so duplicate runs over the same source
//! object are expected; the transform's partition overwrite absorbs them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{error, info};

use crate::config::JobStarterSettings;
use crate::error::PipelineError;
use crate::jobs::{JobRunId, JobRunner, SOURCE_PATH_ARG};
use crate::response::InvocationResponse;
use crate::storage::{Location, StorageError};

#[derive(Debug, Error)]
pub enum EventError {
    #[error("notification has no records")]
    NoRecords,

    #[error("malformed notification: {0}")]
    Malformed(String),

    #[error("notification names an invalid object: {0}")]
    InvalidObject(#[from] StorageError),
}

/// Storage "object created" notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// URL-escaped object key as delivered.
    pub key: String,
}

impl StorageEvent {
    pub fn from_json(json: &str) -> Result<Self, EventError> {
        serde_json::from_str(json).map_err(|e| EventError::Malformed(e.to_string()))
    }

    /// Notification for a single created object (the key is escaped the way the
    /// storage service escapes it).
    pub fn object_created(location: &Location) -> Self {
        let key = location
            .key()
            .split('/')
            .map(|segment| urlencoding::encode(segment).replace("%20", "+"))
            .collect::<Vec<_>>()
            .join("/");

        Self {
            records: vec![EventRecord {
                s3: S3Entity {
                    bucket: BucketRef {
                        name: location.bucket().to_string(),
                    },
                    object: ObjectRef { key },
                },
            }],
        }
    }

    /// Decoded location of the first record's object.
    pub fn source_location(&self) -> Result<Location, EventError> {
        let record = self.records.first().ok_or(EventError::NoRecords)?;
        let key = decode_key(&record.s3.object.key);
        Ok(Location::new(record.s3.bucket.name.as_str(), key)?)
    }
}

/// Decode an object key with form semantics: `+` is a space, then `%XX` escapes.
///
/// Byte sequences that are not UTF-8 are replaced rather than rejected.
pub fn decode_key(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    let bytes = urlencoding::decode_binary(spaced.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

pub struct JobStarter<'a> {
    settings: JobStarterSettings,
    runner: &'a dyn JobRunner,
}

impl<'a> JobStarter<'a> {
    pub fn new(settings: JobStarterSettings, runner: &'a dyn JobRunner) -> Self {
        Self { settings, runner }
    }

    /// Start one transform run for the notification's object.
    ///
    /// Start failures are logged and returned unchanged.
    pub fn handle(
        &self,
        event: &StorageEvent,
    ) -> Result<(JobRunId, InvocationResponse), PipelineError> {
        let source = event.source_location()?;
        let job_name = &self.settings.job_name;
        info!(%source, "object created");
        info!(%job_name, "attempting to start job");

        let mut arguments = BTreeMap::new();
        arguments.insert(SOURCE_PATH_ARG.to_string(), source.to_string());

        match self.runner.start_job_run(job_name, &arguments) {
            Ok(run_id) => {
                info!(%job_name, %run_id, "job started");
                let response = InvocationResponse::ok(format!("Started job. Run ID: {run_id}"));
                Ok((run_id, response))
            }
            Err(e) => {
                error!(%job_name, error = %e, "failed to start job");
                Err(e.into())
            }
        }
    }
}

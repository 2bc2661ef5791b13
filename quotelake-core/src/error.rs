//! Top-level error type for pipeline invocations.

use polars::prelude::PolarsError;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::data::{SchemaError, SourceError};
use crate::job_starter::EventError;
use crate::jobs::JobError;
use crate::storage::{Location, StorageError};

/// Any failure of an extractor, job starter or transform invocation.
///
/// Every variant propagates unchanged to the invoking platform; nothing here is retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("dataframe error: {0}")]
    Frame(#[from] PolarsError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("no input objects under {0}")]
    NoInput(Location),

    #[error("invalid partition: {0}")]
    InvalidPartition(String),
}

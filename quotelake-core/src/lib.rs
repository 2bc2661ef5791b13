//! quotelake core: a daily single-ticker quote pipeline.
//!
//! Three independent invocations, composed only through storage and notifications:
//! - [`extractor`] pulls the latest daily window for one ticker into the raw zone
//! - [`job_starter`] turns an "object created" notification into one transform run
//! - [`transform`] renames fields, derives the daily variation, writes the refined zone
//!   partitioned by ticker/year/month/day and registers the partitions in the [`catalog`]
//!
//! The managed services (object store, job runner, catalog, market data) sit behind
//! narrow traits with local implementations.

pub mod catalog;
pub mod config;
pub mod data;
pub mod error;
pub mod extractor;
pub mod job_starter;
pub mod jobs;
pub mod response;
pub mod storage;
pub mod transform;

pub use error::PipelineError;
pub use response::InvocationResponse;

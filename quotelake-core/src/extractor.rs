//! Extractor: one ticker's latest daily window into the raw zone.
//!
//! Layout: `s3://{bucket}/raw/ticker={T}/year={Y}/month={M}/day={D}/{YYYY-MM-DD}.parquet`
//!
//! The path depends only on ticker and the UTC run date, so re-running on the same day
//! overwrites the same object. An empty fetch is a normal outcome and writes nothing.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::data::{raw_frame, MarketDataSource, PartitionKey, RawSchema};
use crate::config::ExtractorSettings;
use crate::error::PipelineError;
use crate::response::InvocationResponse;
use crate::storage::{parquet, Location, ObjectStore};

/// Prefix of the raw zone inside the bucket.
pub const RAW_PREFIX: &str = "raw";

/// What a single extraction run did.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractOutcome {
    /// The source returned no bars for the window.
    NoData { ticker: String },
    /// Rows were written to `location`.
    Written { location: Location, rows: usize },
}

impl ExtractOutcome {
    pub fn response(&self) -> InvocationResponse {
        match self {
            ExtractOutcome::NoData { ticker } => {
                InvocationResponse::no_content(format!("No data for {ticker}."))
            }
            ExtractOutcome::Written { location, .. } => {
                InvocationResponse::ok(format!("Successfully saved data to {location}"))
            }
        }
    }
}

/// Raw object location for a ticker on a run date.
pub fn raw_location(bucket: &str, key: &PartitionKey) -> Result<Location, PipelineError> {
    let date = key.date().ok_or_else(|| {
        PipelineError::InvalidPartition(format!("{key} is not a calendar date"))
    })?;
    let root = Location::new(bucket, RAW_PREFIX)?;
    Ok(root.join(&format!("{}/{}.parquet", key.path(), date.format("%Y-%m-%d"))))
}

pub struct Extractor<'a> {
    settings: ExtractorSettings,
    source: &'a dyn MarketDataSource,
    store: &'a dyn ObjectStore,
}

impl<'a> Extractor<'a> {
    pub fn new(
        settings: ExtractorSettings,
        source: &'a dyn MarketDataSource,
        store: &'a dyn ObjectStore,
    ) -> Self {
        Self {
            settings,
            source,
            store,
        }
    }

    /// Run against the process wall clock.
    pub fn run(&self) -> Result<ExtractOutcome, PipelineError> {
        self.run_at(Utc::now())
    }

    /// Run as if the wall clock read `now`.
    pub fn run_at(&self, now: DateTime<Utc>) -> Result<ExtractOutcome, PipelineError> {
        let ticker = &self.settings.ticker;
        info!(%ticker, source = self.source.name(), "starting extraction");

        let fetched = self.source.fetch_latest(ticker)?;
        if fetched.is_empty() {
            warn!(%ticker, "no data returned; weekend or market holiday");
            return Ok(ExtractOutcome::NoData {
                ticker: ticker.clone(),
            });
        }

        let stamp = PartitionKey::new(ticker.as_str(), now.date_naive());
        let df = raw_frame(&fetched.bars, &stamp)?;
        RawSchema::validate(&df)?;

        let location = raw_location(&self.settings.bucket, &stamp)?;
        info!(%location, rows = df.height(), "saving raw partition");
        parquet::write_frame(self.store, &location, &df)?;

        info!(%location, "raw partition saved");
        Ok(ExtractOutcome::Written {
            location,
            rows: df.height(),
        })
    }
}

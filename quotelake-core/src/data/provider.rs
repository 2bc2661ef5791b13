//! Market-data source trait and structured error types.
//!
//! The MarketDataSource trait abstracts over where quotes come from (Yahoo Finance in
//! production, fixed bars in tests) so the extractor never depends on a concrete client.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Daily OHLCV bar as returned by a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Structured error types for market-data fetches.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} from market-data source for {symbol}")]
    Http { status: u16, symbol: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("source error: {0}")]
    Other(String),
}

/// Result of a fetch for a single symbol. `bars` may be empty on non-trading days.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub bars: Vec<RawBar>,
}

impl FetchResult {
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Anything that can return the most recent daily window for a symbol.
pub trait MarketDataSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch the most recent one-day window of daily bars.
    ///
    /// An empty `bars` vector is a valid answer (weekend, holiday), not an error.
    fn fetch_latest(&self, symbol: &str) -> Result<FetchResult, SourceError>;
}

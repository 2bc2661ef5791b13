//! Shared fixtures: stub market data and a scratch platform.

#![allow(dead_code)]

use chrono::NaiveDate;
use quotelake_core::catalog::FileCatalog;
use quotelake_core::data::{FetchResult, MarketDataSource, RawBar, SourceError};
use quotelake_core::storage::LocalObjectStore;
use tempfile::TempDir;

/// Returns the same bars on every fetch.
pub struct StaticSource {
    pub bars: Vec<RawBar>,
}

impl StaticSource {
    pub fn empty() -> Self {
        Self { bars: Vec::new() }
    }

    pub fn session(date: NaiveDate, open: f64, close: f64, volume: u64) -> Self {
        Self {
            bars: vec![RawBar {
                date,
                open,
                high: open.max(close),
                low: open.min(close),
                close,
                volume,
            }],
        }
    }
}

impl MarketDataSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch_latest(&self, symbol: &str) -> Result<FetchResult, SourceError> {
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars: self.bars.clone(),
        })
    }
}

/// Fails every fetch as an unreachable network would.
pub struct UnreachableSource;

impl MarketDataSource for UnreachableSource {
    fn name(&self) -> &str {
        "unreachable"
    }

    fn fetch_latest(&self, _symbol: &str) -> Result<FetchResult, SourceError> {
        Err(SourceError::NetworkUnreachable("connection refused".into()))
    }
}

/// Object store and catalog rooted in one temp directory.
pub struct Scratch {
    pub dir: TempDir,
    pub store: LocalObjectStore,
    pub catalog: FileCatalog,
}

impl Scratch {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path().join("lake"));
        let catalog = FileCatalog::new(dir.path().join("catalog"));
        Self {
            dir,
            store,
            catalog,
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Noon UTC on the given day.
pub fn at(y: i32, m: u32, d: u32) -> chrono::DateTime<chrono::Utc> {
    date(y, m, d).and_hms_opt(12, 0, 0).unwrap().and_utc()
}

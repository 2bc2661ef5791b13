//! Partition keys shared by the raw and refined zones.
//!
//! Path form: `ticker={TICKER}/year={Y}/month={M}/day={D}`. Month and day are not
//! zero-padded; the same values are carried as row columns.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Partition columns in path order.
pub const PARTITION_COLUMNS: [&str; 4] = ["ticker", "year", "month", "day"];

/// One partition of the raw or refined dataset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionKey {
    pub ticker: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl PartitionKey {
    pub fn new(ticker: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            ticker: ticker.into(),
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }

    /// `ticker=../year=../month=../day=..` (no leading or trailing slash).
    pub fn path(&self) -> String {
        format!(
            "ticker={}/year={}/month={}/day={}",
            self.ticker, self.year, self.month, self.day
        )
    }

    /// Values in [`PARTITION_COLUMNS`] order, as the catalog stores them.
    pub fn values(&self) -> Vec<String> {
        vec![
            self.ticker.clone(),
            self.year.to_string(),
            self.month.to_string(),
            self.day.to_string(),
        ]
    }

    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }

    /// Recover a key from any path containing the four `name=value` segments in order.
    pub fn from_path(path: &str) -> Option<Self> {
        let mut segments = path
            .split('/')
            .filter_map(|s| s.split_once('='))
            .skip_while(|(k, _)| *k != PARTITION_COLUMNS[0]);

        let ticker = expect_segment(segments.next(), "ticker")?.to_string();
        let year = expect_segment(segments.next(), "year")?.parse().ok()?;
        let month = expect_segment(segments.next(), "month")?.parse().ok()?;
        let day = expect_segment(segments.next(), "day")?.parse().ok()?;

        Some(Self {
            ticker,
            year,
            month,
            day,
        })
    }
}

fn expect_segment<'a>(seg: Option<(&'a str, &'a str)>, name: &str) -> Option<&'a str> {
    match seg {
        Some((k, v)) if k == name && !v.is_empty() => Some(v),
        _ => None,
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

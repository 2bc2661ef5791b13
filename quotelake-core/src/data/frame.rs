//! Conversion of fetched bars into raw-zone DataFrames.

use super::partition::PartitionKey;
use super::provider::RawBar;
use chrono::NaiveDate;
use polars::prelude::*;

fn epoch_days(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}

/// Build a raw-zone DataFrame from fetched bars.
///
/// Every row is stamped with the partition key of the run (not the bar's own trade date):
/// the raw path is keyed by extraction day and the row values must match it.
pub fn raw_frame(bars: &[RawBar], stamp: &PartitionKey) -> PolarsResult<DataFrame> {
    let n = bars.len();
    let dates: Vec<i32> = bars.iter().map(|b| epoch_days(b.date)).collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<u64> = bars.iter().map(|b| b.volume).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates).cast(&DataType::Date)?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
        Column::new("ticker".into(), vec![stamp.ticker.as_str(); n]),
        Column::new("year".into(), vec![stamp.year; n]),
        Column::new("month".into(), vec![stamp.month as i32; n]),
        Column::new("day".into(), vec![stamp.day as i32; n]),
    ])
}

/// Read the partition key stamped on the first row of a frame.
///
/// Frames produced by `partition_by` on the partition columns carry one key per frame.
pub fn partition_key_of(df: &DataFrame) -> PolarsResult<Option<PartitionKey>> {
    let ticker = df.column("ticker")?.str()?.get(0).map(str::to_string);
    let year = df.column("year")?.i32()?.get(0);
    let month = df.column("month")?.i32()?.get(0);
    let day = df.column("day")?.i32()?.get(0);

    Ok(match (ticker, year, month, day) {
        (Some(ticker), Some(year), Some(month), Some(day)) if month > 0 && day > 0 => {
            Some(PartitionKey {
                ticker,
                year,
                month: month as u32,
                day: day as u32,
            })
        }
        _ => None,
    })
}

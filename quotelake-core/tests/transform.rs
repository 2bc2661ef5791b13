//! Transform job: reading, partitioned overwrite and catalog registration.

mod common;

use common::{at, date, Scratch, StaticSource};
use polars::prelude::*;
use quotelake_core::catalog::Catalog;
use quotelake_core::config::ExtractorSettings;
use quotelake_core::data::{raw_frame, PartitionKey, RawBar};
use quotelake_core::extractor::{ExtractOutcome, Extractor};
use quotelake_core::storage::{parquet, Location, ObjectStore};
use quotelake_core::transform::{read_source, TransformJob, TransformSettings, PART_FILE};
use quotelake_core::PipelineError;

fn extract(scratch: &Scratch, ticker: &str, day: u32, open: f64, close: f64) -> Location {
    let source = StaticSource::session(date(2024, 3, day), open, close, 1_000);
    let settings = ExtractorSettings {
        ticker: ticker.into(),
        bucket: "quotes".into(),
    };
    match Extractor::new(settings, &source, &scratch.store)
        .run_at(at(2024, 3, day))
        .unwrap()
    {
        ExtractOutcome::Written { location, .. } => location,
        other => panic!("expected Written, got {other:?}"),
    }
}

fn settings(source: &Location) -> TransformSettings {
    TransformSettings {
        job_name: "refine-quotes".into(),
        source: source.clone(),
        output_root: Location::parse("s3://quotes/refined/").unwrap(),
        database: "market".into(),
        table: "quotes_refined".into(),
    }
}

fn refined_objects(scratch: &Scratch) -> Vec<Location> {
    scratch
        .store
        .list(&Location::parse("s3://quotes/refined/").unwrap())
        .unwrap()
}

#[test]
fn rerun_over_same_source_does_not_duplicate_rows() {
    let scratch = Scratch::new();
    let raw = extract(&scratch, "PETR4.SA", 1, 10.0, 11.0);
    let job = TransformJob::new(&scratch.store, &scratch.catalog);

    job.execute(&settings(&raw)).unwrap();
    job.execute(&settings(&raw)).unwrap();

    let objects = refined_objects(&scratch);
    assert_eq!(objects.len(), 1);
    assert!(objects[0].key().ends_with(PART_FILE));

    let df = parquet::read_frame(&scratch.store, &objects[0]).unwrap();
    assert_eq!(df.height(), 1);
    let variation = df.column("variacao_diaria").unwrap().f64().unwrap().get(0).unwrap();
    assert!((variation - 10.0).abs() < 1e-9);

    let partitions = scratch
        .catalog
        .list_partitions("market", "quotes_refined")
        .unwrap();
    assert_eq!(partitions.len(), 1);
}

#[test]
fn stale_objects_in_a_partition_are_replaced() {
    let scratch = Scratch::new();
    let raw = extract(&scratch, "PETR4.SA", 1, 10.0, 11.0);
    let stale = Location::parse(
        "s3://quotes/refined/ticker=PETR4.SA/year=2024/month=3/day=1/run-older.parquet",
    )
    .unwrap();
    scratch.store.put(&stale, b"left by an older writer").unwrap();

    TransformJob::new(&scratch.store, &scratch.catalog)
        .execute(&settings(&raw))
        .unwrap();

    let objects = refined_objects(&scratch);
    assert_eq!(objects.len(), 1);
    assert_ne!(objects[0], stale);
}

#[test]
fn directory_source_is_read_recursively() {
    let scratch = Scratch::new();
    extract(&scratch, "PETR4.SA", 1, 10.0, 11.0);
    extract(&scratch, "PETR4.SA", 4, 20.0, 19.0);

    let raw_ticker = Location::parse("s3://quotes/raw/ticker=PETR4.SA").unwrap();
    let df = read_source(&scratch.store, &raw_ticker).unwrap();
    assert_eq!(df.height(), 2);

    let report = TransformJob::new(&scratch.store, &scratch.catalog)
        .execute(&settings(&raw_ticker))
        .unwrap();
    assert_eq!(report.rows_read, 2);
    assert_eq!(report.partitions.len(), 2);
    assert_eq!(refined_objects(&scratch).len(), 2);
}

#[test]
fn missing_source_is_an_error() {
    let scratch = Scratch::new();
    let absent = Location::parse("s3://quotes/raw/ticker=NONE/2024-01-01.parquet").unwrap();

    let err = TransformJob::new(&scratch.store, &scratch.catalog)
        .execute(&settings(&absent))
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoInput(_)));
}

#[test]
fn differently_cased_raw_columns_fail_without_output() {
    let scratch = Scratch::new();
    let raw = Location::parse("s3://quotes/raw/ticker=X/year=2024/month=3/day=1/2024-03-01.parquet")
        .unwrap();
    let df = DataFrame::new(vec![
        Column::new("Open".into(), &[1.0]),
        Column::new("Close".into(), &[2.0]),
    ])
    .unwrap();
    parquet::write_frame(&scratch.store, &raw, &df).unwrap();

    let result = TransformJob::new(&scratch.store, &scratch.catalog).execute(&settings(&raw));

    assert!(matches!(result, Err(PipelineError::Frame(_))));
    assert!(refined_objects(&scratch).is_empty());
    assert!(scratch.catalog.get_table("market", "quotes_refined").unwrap().is_none());
}

#[test]
fn zero_open_is_written_as_infinity() {
    let scratch = Scratch::new();
    let raw = extract(&scratch, "PETR4.SA", 1, 0.0, 5.0);

    TransformJob::new(&scratch.store, &scratch.catalog)
        .execute(&settings(&raw))
        .unwrap();

    let df = parquet::read_frame(&scratch.store, &refined_objects(&scratch)[0]).unwrap();
    let variation = df.column("variacao_diaria").unwrap().f64().unwrap().get(0).unwrap();
    assert_eq!(variation, f64::INFINITY);
}

#[test]
fn catalog_table_describes_refined_columns() {
    let scratch = Scratch::new();
    let raw = extract(&scratch, "PETR4.SA", 1, 10.0, 11.0);
    TransformJob::new(&scratch.store, &scratch.catalog)
        .execute(&settings(&raw))
        .unwrap();

    let table = scratch
        .catalog
        .get_table("market", "quotes_refined")
        .unwrap()
        .unwrap();
    assert_eq!(table.location.to_string(), "s3://quotes/refined/");
    assert_eq!(table.format, "parquet");

    let keys: Vec<&str> = table.partition_keys.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(keys, vec!["ticker", "year", "month", "day"]);

    let columns: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    assert!(columns.contains(&"abertura"));
    assert!(columns.contains(&"fechamento"));
    assert!(columns.contains(&"variacao_diaria"));
    assert!(!columns.contains(&"open"));
    assert!(!columns.contains(&"ticker"));
}

#[test]
fn runs_over_different_days_accumulate_catalog_partitions() {
    let scratch = Scratch::new();
    let first = extract(&scratch, "PETR4.SA", 1, 10.0, 11.0);
    let second = extract(&scratch, "PETR4.SA", 4, 20.0, 19.0);
    let job = TransformJob::new(&scratch.store, &scratch.catalog);

    job.execute(&settings(&first)).unwrap();
    job.execute(&settings(&second)).unwrap();

    let values: Vec<Vec<String>> = scratch
        .catalog
        .list_partitions("market", "quotes_refined")
        .unwrap()
        .into_iter()
        .map(|p| p.values)
        .collect();
    assert_eq!(
        values,
        vec![
            vec!["PETR4.SA", "2024", "3", "1"],
            vec!["PETR4.SA", "2024", "3", "4"],
        ]
    );

    let day_one = Location::parse(
        "s3://quotes/refined/ticker=PETR4.SA/year=2024/month=3/day=1/",
    )
    .unwrap();
    let objects = scratch.store.list(&day_one).unwrap();
    assert_eq!(objects.len(), 1);
    let df = parquet::read_frame(&scratch.store, &objects[0]).unwrap();
    assert_eq!(df.column("abertura").unwrap().f64().unwrap().get(0), Some(10.0));
    assert_eq!(refined_objects(&scratch).len(), 2);
}

#[test]
fn rows_stamped_for_another_partition_are_rejected() {
    let scratch = Scratch::new();
    let stamp = PartitionKey::new("PETR4.SA", date(2024, 3, 1));
    let bars = [RawBar {
        date: date(2024, 3, 1),
        open: 10.0,
        high: 11.0,
        low: 10.0,
        close: 11.0,
        volume: 1_000,
    }];
    let misplaced = Location::parse(
        "s3://quotes/raw/ticker=PETR4.SA/year=2024/month=3/day=2/2024-03-02.parquet",
    )
    .unwrap();
    parquet::write_frame(&scratch.store, &misplaced, &raw_frame(&bars, &stamp).unwrap()).unwrap();

    let result = TransformJob::new(&scratch.store, &scratch.catalog).execute(&settings(&misplaced));

    assert!(matches!(result, Err(PipelineError::InvalidPartition(_))));
    assert!(refined_objects(&scratch).is_empty());
}

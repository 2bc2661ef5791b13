//! Extractor behaviour against a stub source and a scratch object store.

mod common;

use common::{at, date, Scratch, StaticSource, UnreachableSource};
use quotelake_core::config::ExtractorSettings;
use quotelake_core::data::SourceError;
use quotelake_core::extractor::{ExtractOutcome, Extractor};
use quotelake_core::storage::{parquet, Location, ObjectStore};
use quotelake_core::PipelineError;

fn settings(ticker: &str) -> ExtractorSettings {
    ExtractorSettings {
        ticker: ticker.into(),
        bucket: "quotes".into(),
    }
}

fn raw_zone() -> Location {
    Location::parse("s3://quotes/raw/").unwrap()
}

#[test]
fn trading_day_writes_one_stamped_object() {
    let scratch = Scratch::new();
    let source = StaticSource::session(date(2024, 2, 29), 30.0, 31.5, 1_000);
    let extractor = Extractor::new(settings("VALE3.SA"), &source, &scratch.store);

    let outcome = extractor.run_at(at(2024, 3, 1)).unwrap();

    let expected =
        "s3://quotes/raw/ticker=VALE3.SA/year=2024/month=3/day=1/2024-03-01.parquet";
    match &outcome {
        ExtractOutcome::Written { location, rows } => {
            assert_eq!(location.to_string(), expected);
            assert_eq!(*rows, 1);
        }
        other => panic!("expected Written, got {other:?}"),
    }
    let response = outcome.response();
    assert_eq!(response.status_code, 200);
    assert!(response.body.contains(expected));

    let objects = scratch.store.list(&raw_zone()).unwrap();
    assert_eq!(objects.len(), 1);

    let df = parquet::read_frame(&scratch.store, &objects[0]).unwrap();
    assert_eq!(df.column("ticker").unwrap().str().unwrap().get(0), Some("VALE3.SA"));
    assert_eq!(df.column("year").unwrap().i32().unwrap().get(0), Some(2024));
    assert_eq!(df.column("month").unwrap().i32().unwrap().get(0), Some(3));
    assert_eq!(df.column("day").unwrap().i32().unwrap().get(0), Some(1));
    assert_eq!(df.column("open").unwrap().f64().unwrap().get(0), Some(30.0));
}

#[test]
fn holiday_returns_no_content_and_writes_nothing() {
    let scratch = Scratch::new();
    let source = StaticSource::empty();
    let extractor = Extractor::new(settings("PETR4.SA"), &source, &scratch.store);

    let outcome = extractor.run_at(at(2024, 12, 25)).unwrap();

    assert_eq!(
        outcome,
        ExtractOutcome::NoData {
            ticker: "PETR4.SA".into()
        }
    );
    assert_eq!(outcome.response().status_code, 204);
    assert!(scratch.store.list(&raw_zone()).unwrap().is_empty());
}

#[test]
fn same_day_rerun_overwrites_same_object() {
    let scratch = Scratch::new();

    let first = StaticSource::session(date(2024, 3, 1), 30.0, 31.0, 10);
    Extractor::new(settings("PETR4.SA"), &first, &scratch.store)
        .run_at(at(2024, 3, 1))
        .unwrap();

    let second = StaticSource::session(date(2024, 3, 1), 30.0, 32.0, 20);
    let later = at(2024, 3, 1) + chrono::Duration::hours(6);
    Extractor::new(settings("PETR4.SA"), &second, &scratch.store)
        .run_at(later)
        .unwrap();

    let objects = scratch.store.list(&raw_zone()).unwrap();
    assert_eq!(objects.len(), 1);
    let df = parquet::read_frame(&scratch.store, &objects[0]).unwrap();
    assert_eq!(df.height(), 1);
    assert_eq!(df.column("close").unwrap().f64().unwrap().get(0), Some(32.0));
}

#[test]
fn fetch_failure_propagates_unchanged() {
    let scratch = Scratch::new();
    let extractor = Extractor::new(settings("PETR4.SA"), &UnreachableSource, &scratch.store);

    let err = extractor.run_at(at(2024, 3, 1)).unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Source(SourceError::NetworkUnreachable(_))
    ));
    assert!(scratch.store.list(&raw_zone()).unwrap().is_empty());
}

//! Job starter: notification decoding and start-failure propagation.

use quotelake_core::config::JobStarterSettings;
use quotelake_core::job_starter::{EventError, JobStarter, StorageEvent};
use quotelake_core::jobs::{JobArguments, JobError, JobRunId, JobRunner, SOURCE_PATH_ARG};
use quotelake_core::PipelineError;
use std::sync::Mutex;

#[derive(Default)]
struct RecordingRunner {
    starts: Mutex<Vec<(String, JobArguments)>>,
}

impl JobRunner for RecordingRunner {
    fn start_job_run(&self, job_name: &str, arguments: &JobArguments) -> Result<JobRunId, JobError> {
        let mut starts = self.starts.lock().unwrap();
        starts.push((job_name.to_string(), arguments.clone()));
        Ok(JobRunId(format!("jr_{}", starts.len())))
    }
}

struct UnavailableRunner;

impl JobRunner for UnavailableRunner {
    fn start_job_run(&self, _job_name: &str, _arguments: &JobArguments) -> Result<JobRunId, JobError> {
        Err(JobError::Unavailable("concurrent run quota exceeded".into()))
    }
}

fn settings() -> JobStarterSettings {
    JobStarterSettings {
        job_name: "refine-quotes".into(),
    }
}

fn notification(bucket: &str, key: &str) -> StorageEvent {
    StorageEvent::from_json(&format!(
        r#"{{"Records":[{{"s3":{{"bucket":{{"name":"{bucket}"}},"object":{{"key":"{key}"}}}}}}]}}"#
    ))
    .unwrap()
}

#[test]
fn starts_one_run_with_decoded_source() {
    let runner = RecordingRunner::default();
    let starter = JobStarter::new(settings(), &runner);
    let event = notification(
        "b",
        "raw/ticker%3DX/year%3D2024/month%3D3/day%3D1/f.parquet",
    );

    let (run_id, response) = starter.handle(&event).unwrap();

    assert_eq!(run_id, JobRunId("jr_1".into()));
    assert_eq!(response.status_code, 200);
    assert!(response.body.contains("jr_1"));

    let starts = runner.starts.lock().unwrap();
    assert_eq!(starts.len(), 1);
    assert_eq!(starts[0].0, "refine-quotes");
    assert_eq!(starts[0].1.len(), 1);
    assert_eq!(
        starts[0].1[SOURCE_PATH_ARG],
        "s3://b/raw/ticker=X/year=2024/month=3/day=1/f.parquet"
    );
}

#[test]
fn duplicate_notifications_start_duplicate_runs() {
    let runner = RecordingRunner::default();
    let starter = JobStarter::new(settings(), &runner);
    let event = notification("b", "raw/f.parquet");

    starter.handle(&event).unwrap();
    starter.handle(&event).unwrap();

    let starts = runner.starts.lock().unwrap();
    assert_eq!(starts.len(), 2);
    assert_eq!(starts[0].1, starts[1].1);
}

#[test]
fn start_failure_is_reraised() {
    let starter = JobStarter::new(settings(), &UnavailableRunner);
    let err = starter.handle(&notification("b", "raw/f.parquet")).unwrap_err();

    assert!(matches!(err, PipelineError::Job(JobError::Unavailable(_))));
}

#[test]
fn notification_without_records_fails_before_starting() {
    let runner = RecordingRunner::default();
    let starter = JobStarter::new(settings(), &runner);

    let event = StorageEvent::from_json(r#"{"Records":[]}"#).unwrap();
    assert!(starter.handle(&event).is_err());
    assert!(runner.starts.lock().unwrap().is_empty());
}

#[test]
fn key_decoding_to_parent_segments_is_rejected() {
    let runner = RecordingRunner::default();
    let starter = JobStarter::new(settings(), &runner);

    let err = starter
        .handle(&notification("quotes", "raw/..%2F..%2F..%2Fescaped.parquet"))
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Event(EventError::InvalidObject(_))
    ));
    assert!(runner.starts.lock().unwrap().is_empty());
}

use fleet_sim::batch::{load_jobs, parse_batch, write_report, JobReport};
use fleet_sim::scheduler::{Job, JobQueue, JobStatus};
use fleet_sim::{FleetError, ValidationError};

#[test]
fn test_parse_batch() {
    let specs = parse_batch(
        r#"{"jobs": [
            {"id": "J1", "material": "PLA", "est_time": 10, "priority": 2},
            {"id": "J2", "material": "ABS", "est_time": 4.5}
        ]}"#,
    )
    .unwrap();

    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].id, "J1");
    assert_eq!(specs[0].priority, 2);
    assert_eq!(specs[1].est_time, 4.5);
    assert_eq!(specs[1].priority, 0);
}

#[test]
fn test_parse_batch_without_jobs_key() {
    assert!(parse_batch("{}").unwrap().is_empty());
}

#[test]
fn test_parse_batch_rejects_malformed_json() {
    assert!(matches!(parse_batch("{\"jobs\": ["), Err(FleetError::Json(_))));
    assert!(matches!(
        parse_batch(r#"{"jobs": [{"id": "J1"}]}"#),
        Err(FleetError::Json(_))
    ));
}

#[tokio::test]
async fn test_load_jobs_validates_each_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.json");
    tokio::fs::write(
        &path,
        r#"{"jobs": [
            {"id": "J1", "material": "PLA", "est_time": 10, "priority": 2},
            {"id": "J2", "material": "PLA", "est_time": 0, "priority": 1},
            {"id": "", "material": "PLA", "est_time": 3},
            {"id": "J4", "material": "TPU", "est_time": 3, "priority": 0}
        ]}"#,
    )
    .await
    .unwrap();

    let jobs = load_jobs(&path).await.unwrap();
    assert_eq!(jobs.len(), 4);
    assert_eq!(jobs[0].as_ref().unwrap().id(), "J1");
    assert!(matches!(
        jobs[1],
        Err(ValidationError::NonPositiveDuration(_))
    ));
    assert_eq!(jobs[2].as_ref().unwrap_err(), &ValidationError::EmptyId);
    assert_eq!(jobs[3].as_ref().unwrap().material(), "TPU");
}

#[tokio::test]
async fn test_load_jobs_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_jobs(dir.path().join("absent.json")).await;
    assert!(matches!(result, Err(FleetError::Io(_))));
}

#[tokio::test]
async fn test_write_report() {
    let mut queue = JobQueue::new();
    queue.push(Job::new("done", "PLA", 1.0, 0).unwrap()).unwrap();
    queue.push(Job::new("dropped", "PLA", 1.0, 1).unwrap()).unwrap();
    let claimed = queue.pop_next().unwrap();
    queue.mark_completed(claimed).unwrap();
    assert!(queue.cancel("dropped"));

    let dir = tempfile::tempdir().unwrap();
    let report_dir = dir.path().join("logs");
    let path = write_report(&report_dir, queue.records()).await.unwrap();

    assert!(path.starts_with(&report_dir));
    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("job_report_") && name.ends_with(".json"));

    let contents = tokio::fs::read_to_string(&path).await.unwrap();
    let report: JobReport = serde_json::from_str(&contents).unwrap();
    assert_eq!(report.jobs.len(), 2);
    assert_eq!(report.jobs[0].job_id, "done");
    assert_eq!(report.jobs[0].status, JobStatus::Completed);
    assert!(report.jobs[0].started_at.is_some());
    assert_eq!(report.jobs[1].job_id, "dropped");
    assert_eq!(report.jobs[1].status, JobStatus::Canceled);
    assert!(report.jobs[1].started_at.is_none());
    assert_eq!(report.jobs[1].wait_time, 0.0);
}

#[tokio::test]
async fn test_write_empty_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_report(dir.path(), &[]).await.unwrap();

    let report: JobReport =
        serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
    assert!(report.jobs.is_empty());
}

use fleet_sim::history::RecordHistory;
use fleet_sim::scheduler::{Job, JobQueue, JobStatus};

/// One completed and one canceled record, archived through a queue.
fn sample_records() -> Vec<fleet_sim::scheduler::JobRecord> {
    let mut queue = JobQueue::new();
    queue.push(Job::new("printed", "PLA", 4.0, 1).unwrap()).unwrap();
    queue.push(Job::new("dropped", "ABS", 2.0, 3).unwrap()).unwrap();
    let claimed = queue.pop_next().unwrap();
    queue.mark_completed(claimed).unwrap();
    assert!(queue.cancel("dropped"));
    queue.records().to_vec()
}

#[tokio::test]
async fn test_open_creates_database_and_parent_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs").join("job_history.db");

    let history = RecordHistory::open(&path).await.unwrap();
    assert!(path.exists());
    assert!(history.entries().await.unwrap().is_empty());
    history.close().await;
}

#[tokio::test]
async fn test_save_records() {
    let dir = tempfile::tempdir().unwrap();
    let history = RecordHistory::open(dir.path().join("history.db")).await.unwrap();
    let records = sample_records();

    let saved = history.save_records(&records, 12.5).await.unwrap();
    assert_eq!(saved, 2);

    let entries = history.entries().await.unwrap();
    assert_eq!(entries.len(), 2);

    let printed = &entries[0];
    assert_eq!(printed.job_id, "printed");
    assert_eq!(printed.priority, 1);
    assert_eq!(printed.status, JobStatus::Completed);
    assert_eq!(printed.started_at, records[0].started_at);
    assert_eq!(printed.finished_at, records[0].finished_at);
    assert_eq!(printed.estimated_duration, 4.0);
    assert_eq!(printed.wait_time, records[0].wait_time);
    assert_eq!(printed.simulation_time, 12.5);

    let dropped = &entries[1];
    assert_eq!(dropped.job_id, "dropped");
    assert_eq!(dropped.status, JobStatus::Canceled);
    assert!(dropped.started_at.is_none());
    assert_eq!(dropped.wait_time, 0.0);
    assert_eq!(dropped.run_time, 0.0);
}

#[tokio::test]
async fn test_history_accumulates_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.db");

    {
        let history = RecordHistory::open(&path).await.unwrap();
        history.save_records(&sample_records(), 1.0).await.unwrap();
        history.close().await;
    }

    let history = RecordHistory::open(&path).await.unwrap();
    history.save_records(&sample_records(), 2.0).await.unwrap();

    let entries = history.entries().await.unwrap();
    assert_eq!(entries.len(), 4);
    assert!(entries.windows(2).all(|w| w[0].id < w[1].id));
    assert_eq!(entries[0].simulation_time, 1.0);
    assert_eq!(entries[3].simulation_time, 2.0);
}

#[tokio::test]
async fn test_save_empty_run() {
    let dir = tempfile::tempdir().unwrap();
    let history = RecordHistory::open(dir.path().join("history.db")).await.unwrap();

    assert_eq!(history.save_records(&[], 0.0).await.unwrap(), 0);
    assert!(history.entries().await.unwrap().is_empty());
}

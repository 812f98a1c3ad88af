//! Statistics derived from terminal job records.
//!
//! Everything here is a pure function of `(records, elapsed, workers)`; the
//! simulator gathers snapshots and calls [`aggregate`].

use serde::Serialize;

use crate::scheduler::{JobRecord, JobStatus};
use crate::worker::WorkerSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerUtilization {
    pub worker_id: usize,
    pub utilization_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalStats {
    /// Mean seconds between creation and dispatch over completed jobs.
    pub avg_wait_time: f64,
    pub median_wait_time: f64,
    /// Completed jobs per second of simulation time.
    pub throughput: f64,
    pub total_completed: usize,
    pub total_canceled: usize,
    pub total_failed: usize,
    pub total_records: usize,
    /// Seconds since the simulator was started.
    pub total_simulation_time: f64,
    pub worker_utilization: Vec<WorkerUtilization>,
}

pub fn aggregate(records: &[JobRecord], elapsed: f64, workers: &[WorkerSnapshot]) -> GlobalStats {
    let completed: Vec<&JobRecord> = records
        .iter()
        .filter(|r| r.status == JobStatus::Completed)
        .collect();

    let mut wait_times: Vec<f64> = completed
        .iter()
        .filter_map(|r| {
            r.started_at
                .map(|started| (started - r.created_at).num_microseconds().unwrap_or(0) as f64 / 1e6)
        })
        .collect();

    let total_completed = completed.len();
    let throughput = if elapsed > 0.0 {
        total_completed as f64 / elapsed
    } else {
        0.0
    };

    GlobalStats {
        avg_wait_time: mean(&wait_times),
        median_wait_time: median(&mut wait_times),
        throughput,
        total_completed,
        total_canceled: count(records, JobStatus::Canceled),
        total_failed: count(records, JobStatus::Failed),
        total_records: records.len(),
        total_simulation_time: elapsed.max(0.0),
        worker_utilization: workers
            .iter()
            .map(|w| WorkerUtilization {
                worker_id: w.id,
                utilization_percent: w.utilization(elapsed),
            })
            .collect(),
    }
}

fn count(records: &[JobRecord], status: JobStatus) -> usize {
    records.iter().filter(|r| r.status == status).count()
}

/// Arithmetic mean, 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median after sorting in place; even lengths average the two middle values.
pub fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn record(id: &str, status: JobStatus, wait_ms: Option<i64>) -> JobRecord {
        let created = Utc::now();
        let started = wait_ms.map(|ms| created + Duration::milliseconds(ms));
        JobRecord {
            job_id: id.to_string(),
            material: "PLA".to_string(),
            priority: 0,
            estimated_duration: 1.0,
            status,
            created_at: created,
            started_at: started,
            finished_at: started.unwrap_or(created) + Duration::seconds(1),
            wait_time: wait_ms.map(|ms| ms as f64 / 1000.0).unwrap_or(0.0),
            run_time: if started.is_some() { 1.0 } else { 0.0 },
        }
    }

    fn worker(id: usize, busy_time: f64) -> WorkerSnapshot {
        WorkerSnapshot {
            id,
            busy: false,
            current_job: None,
            busy_time,
        }
    }

    #[test]
    fn empty_inputs_yield_zeroes() {
        let stats = aggregate(&[], 0.0, &[worker(0, 0.0), worker(1, 0.0)]);
        assert_eq!(stats.avg_wait_time, 0.0);
        assert_eq!(stats.median_wait_time, 0.0);
        assert_eq!(stats.throughput, 0.0);
        assert_eq!(stats.total_completed, 0);
        assert_eq!(stats.total_records, 0);
        assert_eq!(stats.worker_utilization.len(), 2);
        assert!(stats
            .worker_utilization
            .iter()
            .all(|w| w.utilization_percent == 0.0));
    }

    #[test]
    fn mean_and_median() {
        assert_eq!(mean(&[1.0, 2.0, 6.0]), 3.0);
        assert_eq!(median(&mut [5.0, 1.0, 3.0]), 3.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&mut []), 0.0);
    }

    #[test]
    fn only_started_completed_jobs_contribute_wait() {
        let records = vec![
            record("a", JobStatus::Completed, Some(1000)),
            record("b", JobStatus::Completed, Some(3000)),
            record("c", JobStatus::Canceled, None),
            record("d", JobStatus::Failed, Some(9000)),
        ];
        let stats = aggregate(&records, 4.0, &[]);
        assert_eq!(stats.avg_wait_time, 2.0);
        assert_eq!(stats.median_wait_time, 2.0);
        assert_eq!(stats.total_completed, 2);
        assert_eq!(stats.total_canceled, 1);
        assert_eq!(stats.total_failed, 1);
        assert_eq!(stats.total_records, 4);
        assert_eq!(stats.throughput, 0.5);
    }

    #[test]
    fn zero_elapsed_disables_rates() {
        let records = vec![record("a", JobStatus::Completed, Some(500))];
        let stats = aggregate(&records, 0.0, &[worker(0, 3.0)]);
        assert_eq!(stats.throughput, 0.0);
        assert_eq!(stats.worker_utilization[0].utilization_percent, 0.0);
        assert_eq!(stats.avg_wait_time, 0.5);
    }

    #[test]
    fn utilization_is_busy_share_of_elapsed() {
        let stats = aggregate(&[], 10.0, &[worker(0, 5.0), worker(1, 10.0)]);
        assert_eq!(stats.worker_utilization[0].utilization_percent, 50.0);
        assert_eq!(stats.worker_utilization[1].worker_id, 1);
        assert_eq!(stats.worker_utilization[1].utilization_percent, 100.0);
    }
}

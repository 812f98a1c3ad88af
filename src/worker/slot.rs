use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;

use crate::scheduler::Job;

/// Percentage of `total_elapsed` seconds spent busy. Zero when no time has elapsed.
pub fn utilization(busy_secs: f64, total_elapsed: f64) -> f64 {
    if total_elapsed <= 0.0 {
        return 0.0;
    }
    busy_secs / total_elapsed * 100.0
}

/// One execution slot. Holds at most one job, which it owns exclusively
/// while the job runs.
#[derive(Debug)]
pub struct Worker {
    id: usize,
    current: Option<(Job, Instant)>,
    busy_time: Duration,
}

/// Point-in-time copy of a worker for readers outside the dispatch loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerSnapshot {
    pub id: usize,
    pub busy: bool,
    pub current_job: Option<String>,
    /// Accumulated busy time in seconds, counting finished jobs only.
    pub busy_time: f64,
}

impl WorkerSnapshot {
    pub fn utilization(&self, total_elapsed: f64) -> f64 {
        utilization(self.busy_time, total_elapsed)
    }
}

impl Worker {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            current: None,
            busy_time: Duration::ZERO,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_job(&self) -> Option<&Job> {
        self.current.as_ref().map(|(job, _)| job)
    }

    pub fn busy_time(&self) -> Duration {
        self.busy_time
    }

    /// Take ownership of a claimed job and start the busy clock.
    ///
    /// Hands the job back if this worker is already occupied.
    pub fn start_job(&mut self, job: Job) -> Result<(), Job> {
        if self.current.is_some() {
            return Err(job);
        }
        tracing::debug!(worker_id = self.id, job_id = %job.id(), "Worker picked up job");
        self.current = Some((job, Instant::now()));
        Ok(())
    }

    /// Mark the current job completed, accrue its wall time and release the slot.
    pub fn finish_job(&mut self) -> Option<Job> {
        let (mut job, started) = self.current.take()?;
        job.complete(Utc::now());
        self.busy_time += started.elapsed();
        Some(job)
    }

    /// Mark the current job failed after an execution fault and release the slot.
    pub fn abort_job(&mut self) -> Option<Job> {
        let (mut job, started) = self.current.take()?;
        job.fail(Utc::now());
        self.busy_time += started.elapsed();
        Some(job)
    }

    pub fn utilization(&self, total_elapsed: f64) -> f64 {
        utilization(self.busy_time.as_secs_f64(), total_elapsed)
    }

    pub fn snapshot(&self) -> WorkerSnapshot {
        WorkerSnapshot {
            id: self.id,
            busy: self.is_busy(),
            current_job: self.current_job().map(|job| job.id().to_string()),
            busy_time: self.busy_time.as_secs_f64(),
        }
    }
}

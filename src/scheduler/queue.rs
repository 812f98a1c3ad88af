use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use chrono::Utc;
use serde::Serialize;

use crate::error::ValidationError;
use crate::scheduler::job::{Job, JobRecord, JobStatus};

/// Heap key for a queued job. Derived ordering compares `priority` first and
/// then `sequence`, so equal priorities are served in enqueue order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct DispatchEntry {
    priority: u32,
    sequence: u64,
    job_id: String,
}

#[derive(Debug)]
struct ActiveJob {
    sequence: u64,
    job: Job,
}

/// Counts derived from the active map and the record list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub active: usize,
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub canceled: usize,
    pub failed: usize,
    pub total_processed: usize,
}

/// Priority dispatch state: the heap of dispatch entries, the map of active
/// (queued or running) jobs, and the archive of terminal records.
///
/// Canceling a job does not touch the heap. Stale entries are dropped when
/// they reach the top and their job is no longer queued.
#[derive(Debug, Default)]
pub struct JobQueue {
    heap: BinaryHeap<Reverse<DispatchEntry>>,
    active: HashMap<String, ActiveJob>,
    records: Vec<JobRecord>,
    next_sequence: u64,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a queued job. Ids must be unique among active jobs.
    pub fn push(&mut self, job: Job) -> Result<(), ValidationError> {
        if self.active.contains_key(job.id()) {
            return Err(ValidationError::DuplicateId(job.id().to_string()));
        }
        if job.status() != JobStatus::Queued {
            return Err(ValidationError::AlreadyDispatched(job.id().to_string()));
        }

        self.next_sequence += 1;
        let sequence = self.next_sequence;
        self.heap.push(Reverse(DispatchEntry {
            priority: job.priority(),
            sequence,
            job_id: job.id().to_string(),
        }));
        self.active
            .insert(job.id().to_string(), ActiveJob { sequence, job });
        Ok(())
    }

    /// Claim the highest-priority queued job, marking it running.
    pub fn pop_next(&mut self) -> Option<Job> {
        while let Some(Reverse(entry)) = self.heap.pop() {
            match self.active.get_mut(&entry.job_id) {
                Some(active)
                    if active.sequence == entry.sequence
                        && active.job.status() == JobStatus::Queued =>
                {
                    active.job.start(Utc::now());
                    return Some(active.job.clone());
                }
                _ => {
                    tracing::trace!(job_id = %entry.job_id, "Discarding stale dispatch entry");
                }
            }
        }
        None
    }

    /// Cancel a job that has not been dispatched yet.
    ///
    /// Returns false for unknown ids and for jobs already claimed by a worker.
    pub fn cancel(&mut self, job_id: &str) -> bool {
        let Some(active) = self.active.get_mut(job_id) else {
            return false;
        };
        if !active.job.cancel(Utc::now()) {
            return false;
        }
        if let Some(active) = self.active.remove(job_id) {
            self.records.push(JobRecord::from_job(&active.job));
        }
        true
    }

    /// Archive a job its worker finished. Returns `None` if the job was not
    /// active (already archived or never admitted).
    pub fn mark_completed(&mut self, mut job: Job) -> Option<JobRecord> {
        if job.status() == JobStatus::Running {
            job.complete(Utc::now());
        }
        self.archive(job, JobStatus::Completed)
    }

    /// Archive a job whose execution faulted.
    pub fn mark_failed(&mut self, mut job: Job) -> Option<JobRecord> {
        if job.status() == JobStatus::Running {
            job.fail(Utc::now());
        }
        self.archive(job, JobStatus::Failed)
    }

    fn archive(&mut self, job: Job, expected: JobStatus) -> Option<JobRecord> {
        if job.status() != expected {
            tracing::warn!(job_id = %job.id(), status = %job.status(), "Job not archivable");
            return None;
        }
        match self.active.get(job.id()) {
            Some(active) if active.job.status() == JobStatus::Running => {}
            _ => {
                tracing::warn!(job_id = %job.id(), "Archiving a job that is not running");
                return None;
            }
        }
        self.active.remove(job.id());
        let record = JobRecord::from_job(&job);
        self.records.push(record.clone());
        Some(record)
    }

    pub fn get_job(&self, job_id: &str) -> Option<&Job> {
        self.active.get(job_id).map(|active| &active.job)
    }

    /// Active jobs in submission order.
    pub fn active_jobs(&self) -> Vec<Job> {
        let mut active: Vec<&ActiveJob> = self.active.values().collect();
        active.sort_by_key(|a| a.sequence);
        active.into_iter().map(|a| a.job.clone()).collect()
    }

    /// Terminal records in the order they were archived.
    pub fn records(&self) -> &[JobRecord] {
        &self.records
    }

    /// Number of jobs still waiting for dispatch.
    pub fn queued_len(&self) -> usize {
        self.active
            .values()
            .filter(|a| a.job.status() == JobStatus::Queued)
            .count()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        let count = |status: JobStatus| self.records.iter().filter(|r| r.status == status).count();
        QueueStats {
            active: self.active.len(),
            queued: self.queued_len(),
            running: self
                .active
                .values()
                .filter(|a| a.job.status() == JobStatus::Running)
                .count(),
            completed: count(JobStatus::Completed),
            canceled: count(JobStatus::Canceled),
            failed: count(JobStatus::Failed),
            total_processed: self.records.len(),
        }
    }
}

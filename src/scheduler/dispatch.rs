use tokio::sync::{Notify, RwLock};

use crate::error::ValidationError;
use crate::scheduler::job::{Job, JobRecord};
use crate::scheduler::queue::{JobQueue, QueueStats};

/// Shared front of the [`JobQueue`] used by the worker loops and by every
/// read path.
///
/// All operations go through one lock, so enqueue, claim, cancel, archive
/// and the snapshot readers are linearizable with respect to each other.
/// Readers only ever get clones.
#[derive(Debug, Default)]
pub struct DispatchQueue {
    state: RwLock<JobQueue>,
    available: Notify,
    /// Signalled whenever an archive leaves no active job behind.
    drained: Notify,
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enqueue(&self, job: Job) -> Result<Job, ValidationError> {
        let admitted = job.clone();
        self.state.write().await.push(job)?;
        tracing::debug!(job_id = %admitted.id(), priority = admitted.priority(), "Job enqueued");
        self.available.notify_one();
        Ok(admitted)
    }

    /// Admit a batch under a single lock acquisition, so a waiting worker
    /// never claims from a partially admitted batch. Entries that already
    /// failed validation pass through unchanged.
    pub async fn enqueue_batch(
        &self,
        jobs: Vec<Result<Job, ValidationError>>,
    ) -> Vec<Result<Job, ValidationError>> {
        let mut admitted = 0usize;
        let results: Vec<Result<Job, ValidationError>> = {
            let mut queue = self.state.write().await;
            jobs.into_iter()
                .map(|job| -> Result<Job, ValidationError> {
                    let job = job?;
                    let snapshot = job.clone();
                    queue.push(job)?;
                    admitted += 1;
                    Ok(snapshot)
                })
                .collect()
        };
        tracing::debug!(admitted, rejected = results.len() - admitted, "Batch enqueued");
        for _ in 0..admitted {
            self.available.notify_one();
        }
        results
    }

    /// Wait until a queued job can be claimed and return it, already marked
    /// running. Each job is handed to exactly one caller.
    ///
    /// Dropping the returned future before it resolves never loses a job:
    /// the claim and the return happen in the same poll.
    pub async fn dequeue(&self) -> Job {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            // Register before checking so an enqueue between the check and
            // the await still wakes us.
            notified.as_mut().enable();

            {
                let mut queue = self.state.write().await;
                if let Some(job) = queue.pop_next() {
                    if queue.queued_len() > 0 {
                        self.available.notify_one();
                    }
                    return job;
                }
            }

            notified.await;
        }
    }

    /// Non-blocking claim, used where waiting is not wanted.
    pub async fn try_dequeue(&self) -> Option<Job> {
        self.state.write().await.pop_next()
    }

    pub async fn cancel(&self, job_id: &str) -> bool {
        let mut queue = self.state.write().await;
        let canceled = queue.cancel(job_id);
        self.signal_if_drained(&queue);
        canceled
    }

    pub async fn mark_completed(&self, job: Job) -> Option<JobRecord> {
        let mut queue = self.state.write().await;
        let record = queue.mark_completed(job);
        self.signal_if_drained(&queue);
        record
    }

    pub async fn mark_failed(&self, job: Job) -> Option<JobRecord> {
        let mut queue = self.state.write().await;
        let record = queue.mark_failed(job);
        self.signal_if_drained(&queue);
        record
    }

    /// Resolve once no job is queued or running.
    pub async fn wait_until_drained(&self) {
        loop {
            let drained = self.drained.notified();
            tokio::pin!(drained);
            drained.as_mut().enable();

            if self.state.read().await.is_empty() {
                return;
            }
            drained.await;
        }
    }

    fn signal_if_drained(&self, queue: &JobQueue) {
        if queue.is_empty() {
            self.drained.notify_waiters();
        }
    }

    pub async fn get_job(&self, job_id: &str) -> Option<Job> {
        self.state.read().await.get_job(job_id).cloned()
    }

    pub async fn active_jobs(&self) -> Vec<Job> {
        self.state.read().await.active_jobs()
    }

    pub async fn records(&self) -> Vec<JobRecord> {
        self.state.read().await.records().to_vec()
    }

    pub async fn stats(&self) -> QueueStats {
        self.state.read().await.stats()
    }
}

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::SimulatorConfig;
use crate::error::{FleetError, Result, ValidationError};
use crate::scheduler::{DispatchQueue, Job, JobRecord, JobSpec, QueueStats};
use crate::stats::{self, GlobalStats};
use crate::worker::{JobExecutor, Worker, WorkerSnapshot};

#[derive(Default)]
struct Lifecycle {
    started_at: Option<Instant>,
    running: Option<CancellationToken>,
    loops: Vec<JoinHandle<()>>,
}

/// Owns the worker pool and the dispatch queue.
///
/// Construct one explicitly and share it as `Arc<Simulator>` with the HTTP
/// handlers and the shell. Every read method returns a snapshot.
pub struct Simulator {
    config: SimulatorConfig,
    queue: Arc<DispatchQueue>,
    workers: Vec<Arc<Mutex<Worker>>>,
    executor: JobExecutor,
    lifecycle: Mutex<Lifecycle>,
    /// Serializes `start` and `stop` so loops of two generations never
    /// share a worker.
    transition: Mutex<()>,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Result<Self> {
        config.validate()?;
        let workers = (0..config.num_workers)
            .map(|id| Arc::new(Mutex::new(Worker::new(id))))
            .collect();

        Ok(Self {
            executor: JobExecutor::new(config.time_scale),
            config,
            queue: Arc::new(DispatchQueue::new()),
            workers,
            lifecycle: Mutex::new(Lifecycle::default()),
            transition: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    pub fn time_scale(&self) -> f64 {
        self.executor.time_scale()
    }

    pub async fn is_running(&self) -> bool {
        self.lifecycle.lock().await.running.is_some()
    }

    /// Launch one dispatch loop per worker.
    ///
    /// The simulation clock starts on the first call and keeps running
    /// across a stop/start cycle. A `start` issued while a `stop` is draining waits for that stop to
    /// finish first.
    pub async fn start(&self) -> Result<()> {
        let _transition = self.transition.lock().await;
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.running.is_some() {
            return Err(FleetError::AlreadyRunning);
        }

        lifecycle.started_at.get_or_insert_with(Instant::now);
        let token = CancellationToken::new();
        let poll_interval = self.config.poll_interval();

        lifecycle.loops = self
            .workers
            .iter()
            .map(|worker| {
                let worker = worker.clone();
                let queue = self.queue.clone();
                let executor = self.executor;
                let token = token.clone();
                tokio::spawn(async move {
                    Self::worker_loop(worker, queue, executor, poll_interval, token).await;
                })
            })
            .collect();
        lifecycle.running = Some(token);

        tracing::info!(
            workers = self.workers.len(),
            time_scale = self.executor.time_scale(),
            "Started worker loops"
        );
        Ok(())
    }

    /// Stop dispatching and wait for every loop to exit.
    ///
    /// Jobs already executing run to completion; queued jobs stay queued.
    /// The simulator reports running until the last loop has exited, and a
    /// concurrent `stop` returns only after that point. Calling this on a
    /// stopped simulator is a no-op.
    pub async fn stop(&self) {
        let _transition = self.transition.lock().await;
        let (token, loops) = {
            let mut lifecycle = self.lifecycle.lock().await;
            let Some(token) = lifecycle.running.clone() else {
                return;
            };
            (token, std::mem::take(&mut lifecycle.loops))
        };

        token.cancel();
        for result in futures::future::join_all(loops).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Worker loop ended abnormally");
            }
        }
        self.lifecycle.lock().await.running = None;
        tracing::info!("All worker loops stopped");
    }

    pub async fn submit(&self, job: Job) -> std::result::Result<Job, ValidationError> {
        match self.queue.enqueue(job).await {
            Ok(job) => {
                tracing::info!(job_id = %job.id(), priority = job.priority(), "Job submitted");
                Ok(job)
            }
            Err(e) => {
                tracing::info!(error = %e, "Job rejected");
                Err(e)
            }
        }
    }

    /// Submit several jobs; each gets its own result and a rejection never
    /// blocks the rest.
    pub async fn submit_batch(&self, jobs: Vec<Job>) -> Vec<std::result::Result<Job, ValidationError>> {
        self.queue
            .enqueue_batch(jobs.into_iter().map(Ok).collect())
            .await
    }

    /// Validate and submit raw submissions, keeping their order in the results.
    pub async fn submit_specs(
        &self,
        specs: Vec<JobSpec>,
    ) -> Vec<std::result::Result<Job, ValidationError>> {
        let results = self
            .queue
            .enqueue_batch(specs.into_iter().map(Job::try_from).collect())
            .await;
        for result in &results {
            if let Err(e) = result {
                tracing::info!(error = %e, "Job rejected");
            }
        }
        results
    }

    pub async fn cancel(&self, job_id: &str) -> bool {
        let canceled = self.queue.cancel(job_id).await;
        if canceled {
            tracing::info!(job_id, "Job canceled");
        } else {
            tracing::debug!(job_id, "Job not cancelable");
        }
        canceled
    }

    pub async fn get_job(&self, job_id: &str) -> Result<Job> {
        self.queue
            .get_job(job_id)
            .await
            .ok_or_else(|| FleetError::JobNotFound(job_id.to_string()))
    }

    pub async fn list_active(&self) -> Vec<Job> {
        self.queue.active_jobs().await
    }

    pub async fn list_records(&self) -> Vec<JobRecord> {
        self.queue.records().await
    }

    pub async fn queue_stats(&self) -> QueueStats {
        self.queue.stats().await
    }

    pub async fn workers(&self) -> Vec<WorkerSnapshot> {
        let mut snapshots = Vec::with_capacity(self.workers.len());
        for worker in &self.workers {
            snapshots.push(worker.lock().await.snapshot());
        }
        snapshots
    }

    /// Time since the first `start`, zero if never started.
    pub async fn elapsed(&self) -> Duration {
        self.lifecycle
            .lock()
            .await
            .started_at
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }

    pub async fn global_stats(&self) -> GlobalStats {
        let elapsed = self.elapsed().await.as_secs_f64();
        let records = self.list_records().await;
        let workers = self.workers().await;
        stats::aggregate(&records, elapsed, &workers)
    }

    /// Resolve once no job is queued or running.
    pub async fn wait_until_drained(&self) {
        self.queue.wait_until_drained().await;
    }

    /// Dispatch loop for one worker: Idle -> Dispatching -> Executing -> Idle
    /// until the running token is cancelled.
    ///
    /// Each dequeue waits at most `poll_interval` so the loop re-checks the
    /// token even when no job arrives. Errors from one job are logged and the
    /// loop keeps serving.
    async fn worker_loop(
        worker: Arc<Mutex<Worker>>,
        queue: Arc<DispatchQueue>,
        executor: JobExecutor,
        poll_interval: Duration,
        running: CancellationToken,
    ) {
        let worker_id = worker.lock().await.id();
        tracing::debug!(worker_id, "Worker loop started");

        while !running.is_cancelled() {
            let job = tokio::select! {
                biased;
                _ = running.cancelled() => break,
                claimed = tokio::time::timeout(poll_interval, queue.dequeue()) => match claimed {
                    Ok(job) => job,
                    // Nothing to do this cycle
                    Err(_) => continue,
                },
            };

            if let Err(e) = Self::run_job(worker_id, &worker, &queue, &executor, job).await {
                tracing::error!(worker_id, error = %e, "Job execution failed");
            }
        }

        tracing::info!(worker_id, "Worker stopped");
    }

    async fn run_job(
        worker_id: usize,
        worker: &Mutex<Worker>,
        queue: &DispatchQueue,
        executor: &JobExecutor,
        job: Job,
    ) -> Result<()> {
        let job_id = job.id().to_string();
        let estimated_duration = job.estimated_duration();

        let started = worker.lock().await.start_job(job);
        if let Err(job) = started {
            queue.mark_failed(job).await;
            return Err(FleetError::WorkerBusy(worker_id));
        }

        if let Err(e) = executor.execute(&job_id, estimated_duration).await {
            let aborted = worker.lock().await.abort_job();
            if let Some(job) = aborted {
                queue.mark_failed(job).await;
            }
            return Err(e);
        }

        let finished = worker.lock().await.finish_job();
        match finished {
            Some(job) => match queue.mark_completed(job).await {
                Some(record) => {
                    tracing::info!(
                        worker_id,
                        job_id = %record.job_id,
                        wait_time = record.wait_time,
                        run_time = record.run_time,
                        "Job completed"
                    );
                }
                None => {
                    tracing::warn!(worker_id, job_id = %job_id, "Completed job was no longer active");
                }
            },
            None => {
                tracing::warn!(worker_id, job_id = %job_id, "Worker lost track of its job");
            }
        }
        Ok(())
    }
}

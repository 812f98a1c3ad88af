use std::time::Duration;

use crate::error::{FleetError, Result};

/// Runs jobs by sleeping for their scaled duration.
///
/// The time scale is fixed at construction and applied to every job, so a
/// job's simulated run time is always `estimated_duration * time_scale`.
#[derive(Debug, Clone, Copy)]
pub struct JobExecutor {
    time_scale: f64,
}

impl JobExecutor {
    pub fn new(time_scale: f64) -> Self {
        Self { time_scale }
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Simulated execution time for a job of `estimated_duration` seconds.
    ///
    /// Fails when the scaled value is not a representable duration.
    pub fn execution_time(&self, job_id: &str, estimated_duration: f64) -> Result<Duration> {
        let scaled = estimated_duration * self.time_scale;
        Duration::try_from_secs_f64(scaled).map_err(|e| FleetError::Execution {
            job_id: job_id.to_string(),
            reason: format!("cannot simulate {scaled}s of work: {e}"),
        })
    }

    /// Simulate the job, suspending only the calling task.
    pub async fn execute(&self, job_id: &str, estimated_duration: f64) -> Result<Duration> {
        let run_for = self.execution_time(job_id, estimated_duration)?;
        tracing::info!(job_id, estimated_duration, run_for = ?run_for, "Executing job");
        tokio::time::sleep(run_for).await;
        Ok(run_for)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Canceled,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Canceled | JobStatus::Failed
        )
    }

    fn can_become(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Running)
                | (JobStatus::Queued, JobStatus::Canceled)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Canceled => write!(f, "canceled"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "canceled" => Ok(JobStatus::Canceled),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status '{other}'")),
        }
    }
}

/// One unit of work (a print job).
///
/// Identity fields are fixed at construction; lifecycle fields only move
/// forward through the transition methods, which the queue and the owning
/// worker call while they hold the job.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    id: String,
    material: String,
    estimated_duration: f64,
    priority: u32,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    status: JobStatus,
}

impl Job {
    /// Build a validated, queued job. Lower `priority` values are served first.
    pub fn new(
        id: impl Into<String>,
        material: impl Into<String>,
        estimated_duration: f64,
        priority: i64,
    ) -> Result<Self, ValidationError> {
        Self::with_created_at(id, material, estimated_duration, priority, Utc::now())
    }

    pub fn with_created_at(
        id: impl Into<String>,
        material: impl Into<String>,
        estimated_duration: f64,
        priority: i64,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if !estimated_duration.is_finite() || estimated_duration <= 0.0 {
            return Err(ValidationError::NonPositiveDuration(estimated_duration));
        }
        if priority < 0 {
            return Err(ValidationError::NegativePriority(priority));
        }
        let priority =
            u32::try_from(priority).map_err(|_| ValidationError::PriorityOutOfRange(priority))?;

        Ok(Self {
            id,
            material: material.into(),
            estimated_duration,
            priority,
            created_at,
            started_at: None,
            finished_at: None,
            status: JobStatus::Queued,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn material(&self) -> &str {
        &self.material
    }

    /// Nominal duration in seconds, before the simulator's time scale is applied.
    pub fn estimated_duration(&self) -> f64 {
        self.estimated_duration
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Seconds spent queued before dispatch, once the job has started.
    pub fn wait_time(&self) -> Option<f64> {
        self.started_at
            .map(|started| seconds_between(self.created_at, started))
    }

    /// Seconds between dispatch and finish, once both are known.
    pub fn run_time(&self) -> Option<f64> {
        match (self.started_at, self.finished_at) {
            (Some(started), Some(finished)) => Some(seconds_between(started, finished)),
            _ => None,
        }
    }

    pub(crate) fn start(&mut self, at: DateTime<Utc>) -> bool {
        if !self.transition(JobStatus::Running) {
            return false;
        }
        self.started_at = Some(at);
        true
    }

    pub(crate) fn complete(&mut self, at: DateTime<Utc>) -> bool {
        self.finish(JobStatus::Completed, at)
    }

    pub(crate) fn cancel(&mut self, at: DateTime<Utc>) -> bool {
        self.finish(JobStatus::Canceled, at)
    }

    pub(crate) fn fail(&mut self, at: DateTime<Utc>) -> bool {
        self.finish(JobStatus::Failed, at)
    }

    fn finish(&mut self, status: JobStatus, at: DateTime<Utc>) -> bool {
        if !self.transition(status) {
            return false;
        }
        self.finished_at.get_or_insert(at);
        true
    }

    fn transition(&mut self, next: JobStatus) -> bool {
        if !self.status.can_become(next) {
            tracing::warn!(
                job_id = %self.id,
                from = %self.status,
                to = %next,
                "Rejected job status transition"
            );
            return false;
        }
        self.status = next;
        true
    }
}

/// Wire shape of a job submission (HTTP body, batch file entry).
///
/// Priority is signed here so that negative values reach validation and are
/// reported instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub id: String,
    pub material: String,
    pub est_time: f64,
    #[serde(default)]
    pub priority: i64,
}

impl TryFrom<JobSpec> for Job {
    type Error = ValidationError;

    fn try_from(spec: JobSpec) -> Result<Self, Self::Error> {
        Job::new(spec.id, spec.material, spec.est_time, spec.priority)
    }
}

/// Immutable archive entry for a job that reached a terminal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub material: String,
    pub priority: u32,
    /// Nominal duration in seconds.
    pub estimated_duration: f64,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    /// `None` when the job never left the queue (canceled before dispatch).
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: DateTime<Utc>,
    /// Seconds queued before dispatch; 0 if never dispatched.
    pub wait_time: f64,
    /// Seconds of execution; 0 if never dispatched.
    pub run_time: f64,
}

impl JobRecord {
    pub(crate) fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            material: job.material.clone(),
            priority: job.priority,
            estimated_duration: job.estimated_duration,
            status: job.status,
            created_at: job.created_at,
            started_at: job.started_at,
            finished_at: job.finished_at.unwrap_or_else(Utc::now),
            wait_time: job.wait_time().unwrap_or(0.0),
            run_time: job.run_time().unwrap_or(0.0),
        }
    }
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from)
        .num_microseconds()
        .map(|us| us as f64 / 1_000_000.0)
        .unwrap_or(0.0)
}

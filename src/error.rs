use thiserror::Error;

/// Reasons a job is refused at construction or submission time.
///
/// The `Display` output is the reason string reported back to whoever
/// submitted the job (HTTP body, shell output, batch summary).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Estimated time must be a positive number of seconds, got {0}")]
    NonPositiveDuration(f64),

    #[error("Priority must be non-negative, got {0}")]
    NegativePriority(i64),

    #[error("Priority {0} is out of range")]
    PriorityOutOfRange(i64),

    #[error("Job id must not be empty")]
    EmptyId,

    #[error("Job {0} is already active")]
    DuplicateId(String),

    #[error("Job {0} has already left the queue")]
    AlreadyDispatched(String),
}

#[derive(Error, Debug)]
pub enum FleetError {
    #[error("Invalid job: {0}")]
    Validation(#[from] ValidationError),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Worker {0} is already executing a job")]
    WorkerBusy(usize),

    #[error("Simulator is already running")]
    AlreadyRunning,

    #[error("Execution of job {job_id} failed: {reason}")]
    Execution { job_id: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, FleetError>;

//! JSON job batches in, JSON job reports out.
//!
//! Batch files look like `{"jobs": [{"id": "J1", "material": "PLA",
//! "est_time": 10, "priority": 0}, ...]}`. Each entry is validated on its own.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::scheduler::{Job, JobRecord, JobSpec, JobStatus};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchFile {
    #[serde(default)]
    pub jobs: Vec<JobSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub job_id: String,
    pub status: JobStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: DateTime<Utc>,
    pub wait_time: f64,
    pub run_time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobReport {
    pub jobs: Vec<ReportEntry>,
}

impl From<&JobRecord> for ReportEntry {
    fn from(record: &JobRecord) -> Self {
        Self {
            job_id: record.job_id.clone(),
            status: record.status,
            started_at: record.started_at,
            finished_at: record.finished_at,
            wait_time: record.wait_time,
            run_time: record.run_time,
        }
    }
}

impl JobReport {
    pub fn from_records(records: &[JobRecord]) -> Self {
        Self {
            jobs: records.iter().map(ReportEntry::from).collect(),
        }
    }
}

/// Parse a batch document without validating its entries.
pub fn parse_batch(contents: &str) -> Result<Vec<JobSpec>> {
    let batch: BatchFile = serde_json::from_str(contents)?;
    if batch.jobs.is_empty() {
        tracing::warn!("Batch contains no jobs");
    }
    Ok(batch.jobs)
}

/// Read a batch file and validate every entry, keeping file order.
pub async fn load_jobs(path: impl AsRef<Path>) -> Result<Vec<std::result::Result<Job, ValidationError>>> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path).await?;
    let jobs: Vec<_> = parse_batch(&contents)?
        .into_iter()
        .map(Job::try_from)
        .collect();
    tracing::info!(
        path = %path.display(),
        total = jobs.len(),
        valid = jobs.iter().filter(|j| j.is_ok()).count(),
        "Loaded job batch"
    );
    Ok(jobs)
}

/// Write `job_report_<timestamp>.json` into `dir`, creating it if needed.
pub async fn write_report(dir: impl AsRef<Path>, records: &[JobRecord]) -> Result<PathBuf> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir).await?;

    let filename = format!("job_report_{}.json", Utc::now().format("%Y%m%d_%H%M%S"));
    let path = dir.join(filename);
    let body = serde_json::to_vec_pretty(&JobReport::from_records(records))?;
    tokio::fs::write(&path, body).await?;

    tracing::info!(path = %path.display(), jobs = records.len(), "Wrote job report");
    Ok(path)
}

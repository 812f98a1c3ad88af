//! Durable job history in SQLite.
//!
//! Every run appends its terminal records to the `job_history` table,
//! stamped with how long that simulation had been running. The JSON report
//! covers one run; this table accumulates all of them.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use crate::error::Result;
use crate::scheduler::{JobRecord, JobStatus};

/// One stored row of `job_history`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub job_id: String,
    pub priority: i64,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: DateTime<Utc>,
    pub estimated_duration: f64,
    pub wait_time: f64,
    pub run_time: f64,
    /// Seconds the saving simulation had been running.
    pub simulation_time: f64,
}

pub struct RecordHistory {
    pool: SqlitePool,
}

impl RecordHistory {
    /// Open (or create) the database file and make sure the table exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let history = Self { pool };
        history.init_schema().await?;
        tracing::debug!(path = %path.display(), "Opened job history");
        Ok(history)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS job_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id TEXT NOT NULL,
                priority INTEGER NOT NULL,
                status TEXT NOT NULL,
                created_at DATETIME NOT NULL,
                started_at DATETIME,
                finished_at DATETIME NOT NULL,
                estimated_duration REAL NOT NULL,
                wait_time REAL NOT NULL,
                run_time REAL NOT NULL,
                simulation_time REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Append `records` in one transaction. Returns the number of rows written.
    pub async fn save_records(&self, records: &[JobRecord], simulation_time: f64) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO job_history (job_id, priority, status, created_at, started_at,
                                         finished_at, estimated_duration, wait_time, run_time,
                                         simulation_time)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(&record.job_id)
            .bind(i64::from(record.priority))
            .bind(record.status.to_string())
            .bind(record.created_at)
            .bind(record.started_at)
            .bind(record.finished_at)
            .bind(record.estimated_duration)
            .bind(record.wait_time)
            .bind(record.run_time)
            .bind(simulation_time)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        tracing::info!(rows = records.len(), simulation_time, "Saved job history");
        Ok(records.len())
    }

    /// All stored rows, oldest first.
    pub async fn entries(&self) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            "SELECT id, job_id, priority, status, created_at, started_at, finished_at,
                    estimated_duration, wait_time, run_time, simulation_time
             FROM job_history ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }

    pub async fn close(&self) {
        self.pool.close().await
    }
}

fn row_to_entry(row: &SqliteRow) -> Result<HistoryEntry> {
    let status: String = row.try_get("status")?;
    Ok(HistoryEntry {
        id: row.try_get("id")?,
        job_id: row.try_get("job_id")?,
        priority: row.try_get("priority")?,
        status: status
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?,
        created_at: row.try_get("created_at")?,
        started_at: row.try_get("started_at")?,
        finished_at: row.try_get("finished_at")?,
        estimated_duration: row.try_get("estimated_duration")?,
        wait_time: row.try_get("wait_time")?,
        run_time: row.try_get("run_time")?,
        simulation_time: row.try_get("simulation_time")?,
    })
}

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::batch::BatchFile;
use crate::error::FleetError;
use crate::scheduler::{Job, JobSpec};
use crate::simulator::Simulator;

pub type DashboardState = Arc<Simulator>;

#[derive(Serialize)]
struct JobResponse {
    id: String,
    material: String,
    est_time: f64,
    priority: u32,
    status: String,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
}

impl From<&Job> for JobResponse {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id().to_string(),
            material: job.material().to_string(),
            est_time: job.estimated_duration(),
            priority: job.priority(),
            status: job.status().to_string(),
            created_at: job.created_at(),
            started_at: job.started_at(),
        }
    }
}

#[derive(Serialize)]
struct BatchEntryResponse {
    id: String,
    accepted: bool,
    error: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    running: bool,
    workers: usize,
    active_jobs: usize,
    completed: usize,
    canceled: usize,
    failed: usize,
    total_processed: usize,
}

fn error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Routes translating HTTP requests into simulator calls.
pub fn router(state: DashboardState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/jobs", get(list_jobs_handler).post(submit_job_handler))
        .route("/jobs/batch", post(submit_batch_handler))
        .route("/jobs/{id}", get(get_job_handler).delete(cancel_job_handler))
        .route("/records", get(list_records_handler))
        .route("/workers", get(list_workers_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

/// Serve the API until `shutdown` is cancelled.
pub async fn run_dashboard(
    addr: SocketAddr,
    state: DashboardState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Starting HTTP server");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn submit_job_handler(
    State(sim): State<DashboardState>,
    Json(payload): Json<JobSpec>,
) -> impl IntoResponse {
    let id = payload.id.clone();
    let job = match Job::try_from(payload) {
        Ok(job) => job,
        Err(e) => {
            tracing::info!(job_id = %id, error = %e, "Rejected job submission");
            return error(StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    match sim.submit(job).await {
        Ok(job) => (StatusCode::CREATED, Json(JobResponse::from(&job))).into_response(),
        Err(e) => error(StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

async fn submit_batch_handler(
    State(sim): State<DashboardState>,
    Json(batch): Json<BatchFile>,
) -> impl IntoResponse {
    let ids: Vec<String> = batch.jobs.iter().map(|spec| spec.id.clone()).collect();
    let entries: Vec<BatchEntryResponse> = sim
        .submit_specs(batch.jobs)
        .await
        .into_iter()
        .zip(ids)
        .map(|(result, id)| match result {
            Ok(_) => BatchEntryResponse {
                id,
                accepted: true,
                error: None,
            },
            Err(e) => BatchEntryResponse {
                id,
                accepted: false,
                error: Some(e.to_string()),
            },
        })
        .collect();
    Json(entries)
}

async fn list_jobs_handler(State(sim): State<DashboardState>) -> impl IntoResponse {
    let jobs: Vec<JobResponse> = sim.list_active().await.iter().map(JobResponse::from).collect();
    Json(jobs)
}

async fn get_job_handler(
    State(sim): State<DashboardState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match sim.get_job(&id).await {
        Ok(job) => (StatusCode::OK, Json(JobResponse::from(&job))).into_response(),
        Err(e @ FleetError::JobNotFound(_)) => {
            error(StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
        Err(e) => error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn cancel_job_handler(
    State(sim): State<DashboardState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if sim.cancel(&id).await {
        (
            StatusCode::OK,
            Json(MessageResponse {
                message: format!("Job {id} canceled"),
            }),
        )
            .into_response()
    } else {
        error(
            StatusCode::NOT_FOUND,
            format!("Job {id} not found or no longer queued"),
        )
        .into_response()
    }
}

async fn list_records_handler(State(sim): State<DashboardState>) -> impl IntoResponse {
    Json(sim.list_records().await)
}

async fn list_workers_handler(State(sim): State<DashboardState>) -> impl IntoResponse {
    Json(sim.workers().await)
}

async fn stats_handler(State(sim): State<DashboardState>) -> impl IntoResponse {
    Json(sim.global_stats().await)
}

async fn health_handler(State(sim): State<DashboardState>) -> impl IntoResponse {
    let stats = sim.queue_stats().await;
    Json(HealthResponse {
        status: "healthy",
        running: sim.is_running().await,
        workers: sim.num_workers(),
        active_jobs: stats.active,
        completed: stats.completed,
        canceled: stats.canceled,
        failed: stats.failed,
        total_processed: stats.total_processed,
    })
}

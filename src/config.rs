use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{FleetError, Result};

pub const DEFAULT_WORKERS: usize = 1;
pub const DEFAULT_TIME_SCALE: f64 = 0.1;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_HISTORY_DB: &str = "logs/job_history.db";

/// Configuration for the worker pool and the simulated clock.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// Number of workers (printers) in the pool. Fixed for the simulator's lifetime.
    pub num_workers: usize,
    /// Multiplier applied to every job's estimated duration to obtain the
    /// simulated execution time (e.g. 0.1 runs a 10s job in 1s).
    pub time_scale: f64,
    /// Upper bound on how long an idle worker waits for a job before it
    /// re-checks the stop signal.
    pub poll_interval_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            num_workers: DEFAULT_WORKERS,
            time_scale: DEFAULT_TIME_SCALE,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl SimulatorConfig {
    pub fn new(num_workers: usize, time_scale: f64) -> Self {
        Self {
            num_workers,
            time_scale,
            ..Default::default()
        }
    }

    pub fn with_poll_interval_ms(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Reject configurations the dispatch loops cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(FleetError::InvalidConfig(
                "at least one worker is required".to_string(),
            ));
        }
        if !self.time_scale.is_finite() || self.time_scale <= 0.0 {
            return Err(FleetError::InvalidConfig(format!(
                "time scale must be a positive finite number, got {}",
                self.time_scale
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(FleetError::InvalidConfig(
                "poll interval must be at least 1ms".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the HTTP front end started by `fleet-sim serve`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Directory the job report is written to on shutdown.
    pub report_dir: PathBuf,
    /// SQLite file that accumulates job records across runs.
    pub history_db: PathBuf,
    pub simulator: SimulatorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            report_dir: PathBuf::from("logs"),
            history_db: PathBuf::from(DEFAULT_HISTORY_DB),
            simulator: SimulatorConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(listen_addr: SocketAddr, simulator: SimulatorConfig) -> Self {
        Self {
            listen_addr,
            simulator,
            ..Default::default()
        }
    }

    pub fn with_report_dir(mut self, report_dir: impl Into<PathBuf>) -> Self {
        self.report_dir = report_dir.into();
        self
    }

    pub fn with_history_db(mut self, history_db: impl Into<PathBuf>) -> Self {
        self.history_db = history_db.into();
        self
    }
}

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use fleet_sim::batch;
use fleet_sim::config::{
    ServerConfig, SimulatorConfig, DEFAULT_HISTORY_DB, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_TIME_SCALE, DEFAULT_WORKERS,
};
use fleet_sim::dashboard::run_dashboard;
use fleet_sim::history::RecordHistory;
use fleet_sim::shell::Shell;
use fleet_sim::shutdown::install_shutdown_handler;
use fleet_sim::stats::GlobalStats;
use fleet_sim::Simulator;

#[derive(Parser, Debug)]
#[command(name = "fleet-sim")]
#[command(version)]
#[command(about = "Simulate a fleet of workers draining a priority job queue")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the simulator behind an HTTP API
    Serve(ServeArgs),

    /// Run a JSON batch of jobs to completion and print statistics
    Run(RunArgs),

    /// Start the simulator with an interactive command shell
    Shell(ShellArgs),
}

// =============================================================================
// Arguments
// =============================================================================

#[derive(clap::Args, Debug)]
struct SimulatorArgs {
    /// Number of workers (printers) in the pool
    #[arg(long, short = 'w', default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Multiplier applied to each job's estimated duration
    #[arg(long, short = 's', default_value_t = DEFAULT_TIME_SCALE)]
    time_scale: f64,

    /// How long an idle worker waits for a job before re-checking for shutdown
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    poll_interval_ms: u64,

    /// Directory the job report is written to on exit
    #[arg(long, default_value = "logs")]
    report_dir: PathBuf,

    /// SQLite file the job records are appended to on exit
    #[arg(long, default_value = DEFAULT_HISTORY_DB)]
    history_db: PathBuf,
}

impl SimulatorArgs {
    fn config(&self) -> SimulatorConfig {
        SimulatorConfig::new(self.workers, self.time_scale)
            .with_poll_interval_ms(self.poll_interval_ms)
    }
}

#[derive(Parser, Debug)]
struct ServeArgs {
    #[command(flatten)]
    simulator: SimulatorArgs,

    /// Port for the HTTP API
    #[arg(long, default_value = "8000")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Job batch to submit before serving
    #[arg(long)]
    load: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RunArgs {
    #[command(flatten)]
    simulator: SimulatorArgs,

    /// JSON batch file: {"jobs": [{"id", "material", "est_time", "priority"}]}
    file: PathBuf,

    /// Output format for the final statistics
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Parser, Debug)]
struct ShellArgs {
    #[command(flatten)]
    simulator: SimulatorArgs,

    /// Job batch to submit before the prompt opens
    #[arg(long)]
    load: Option<PathBuf>,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Commands::Serve(args) => run_server(args).await,
        Commands::Run(args) => run_batch(args).await,
        Commands::Shell(args) => run_shell(args).await,
    }
}

// =============================================================================
// Command Handlers
// =============================================================================

async fn run_server(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let listen_addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let config = ServerConfig::new(listen_addr, args.simulator.config())
        .with_report_dir(args.simulator.report_dir.clone())
        .with_history_db(args.simulator.history_db.clone());

    let simulator = Arc::new(Simulator::new(config.simulator.clone())?);
    if let Some(path) = &args.load {
        submit_file(&simulator, path).await?;
    }

    tracing::info!(
        listen_addr = %config.listen_addr,
        workers = config.simulator.num_workers,
        time_scale = config.simulator.time_scale,
        "Starting fleet-sim server"
    );

    let shutdown = install_shutdown_handler()?;
    simulator.start().await?;
    let served = run_dashboard(config.listen_addr, simulator.clone(), shutdown.clone()).await;

    simulator.stop().await;
    archive_run(&simulator, &config.report_dir, &config.history_db).await?;
    served?;
    Ok(())
}

async fn run_batch(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let simulator = Simulator::new(args.simulator.config())?;
    submit_file(&simulator, &args.file).await?;

    let shutdown = install_shutdown_handler()?;
    simulator.start().await?;
    tokio::select! {
        _ = simulator.wait_until_drained() => {}
        _ = shutdown.cancelled() => {
            tracing::warn!("Interrupted, unfinished jobs stay queued");
        }
    }
    simulator.stop().await;

    let stats = simulator.global_stats().await;
    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Table => print_stats(&stats),
    }

    archive_run(&simulator, &args.simulator.report_dir, &args.simulator.history_db).await?;
    Ok(())
}

async fn run_shell(args: ShellArgs) -> Result<(), Box<dyn std::error::Error>> {
    let simulator = Arc::new(Simulator::new(args.simulator.config())?);
    if let Some(path) = &args.load {
        submit_file(&simulator, path).await?;
    }

    simulator.start().await?;
    let shell = Shell::new(simulator.clone());
    let session = shell
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await;
    simulator.stop().await;

    archive_run(&simulator, &args.simulator.report_dir, &args.simulator.history_db).await?;
    session?;
    Ok(())
}

// =============================================================================
// Helper Functions
// =============================================================================

async fn submit_file(simulator: &Simulator, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = batch::load_jobs(path).await?;
    let total = loaded.len();

    let mut jobs = Vec::with_capacity(total);
    for entry in loaded {
        match entry {
            Ok(job) => jobs.push(job),
            Err(e) => eprintln!("Skipped job: {}", e),
        }
    }

    let mut accepted = 0;
    for result in simulator.submit_batch(jobs).await {
        match result {
            Ok(_) => accepted += 1,
            Err(e) => eprintln!("Skipped job: {}", e),
        }
    }
    println!("Loaded {} of {} jobs from {}", accepted, total, path.display());
    Ok(())
}

/// Write the JSON report and append the run's records to the history database.
async fn archive_run(
    simulator: &Simulator,
    report_dir: &Path,
    history_db: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = simulator.list_records().await;
    let report = batch::write_report(report_dir, &records).await?;
    println!("Job report written to {}", report.display());

    let history = RecordHistory::open(history_db).await?;
    let saved = history
        .save_records(&records, simulator.elapsed().await.as_secs_f64())
        .await?;
    history.close().await;
    println!("Saved {} records to {}", saved, history_db.display());
    Ok(())
}

fn print_stats(stats: &GlobalStats) {
    println!("Simulation time:  {:.3}s", stats.total_simulation_time);
    println!("Completed:        {}", stats.total_completed);
    println!("Canceled:         {}", stats.total_canceled);
    println!("Failed:           {}", stats.total_failed);
    println!("Average wait:     {:.3}s", stats.avg_wait_time);
    println!("Median wait:      {:.3}s", stats.median_wait_time);
    println!("Throughput:       {:.3} jobs/s", stats.throughput);
    for worker in &stats.worker_utilization {
        println!(
            "Worker {:<3}       {:.1}%",
            worker.worker_id, worker.utilization_percent
        );
    }
}

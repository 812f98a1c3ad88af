//! Interactive command shell over any async line source.
//!
//! Every command maps onto one [`Simulator`] call. Bad input is reported on
//! the output stream and the session carries on.

use std::str::FromStr;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::Result;
use crate::scheduler::Job;
use crate::simulator::Simulator;

const HELP: &str = "\
Available commands:
  add <id> <material> <time> <priority>   add a job
  list                                    list active jobs
  records                                 list finished and canceled jobs
  cancel <id>                             cancel a queued job
  status                                  show queue counters
  stats                                   show wait, throughput and utilization
  help                                    show this help
  stop                                    end the session
";

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Add {
        id: String,
        material: String,
        est_time: f64,
        priority: i64,
    },
    List,
    Records,
    Cancel(String),
    Status,
    Stats,
    Help,
    Stop,
}

impl FromStr for ShellCommand {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else {
            return Err("empty command".to_string());
        };
        let args: Vec<&str> = parts.collect();

        match (name.to_lowercase().as_str(), args.as_slice()) {
            ("add", [id, material, est_time, priority]) => Ok(ShellCommand::Add {
                id: id.to_string(),
                material: material.to_string(),
                est_time: est_time
                    .parse()
                    .map_err(|_| format!("invalid time '{est_time}'"))?,
                priority: priority
                    .parse()
                    .map_err(|_| format!("invalid priority '{priority}'"))?,
            }),
            ("add", _) => Err("usage: add <id> <material> <time> <priority>".to_string()),
            ("cancel", [id]) => Ok(ShellCommand::Cancel(id.to_string())),
            ("cancel", _) => Err("usage: cancel <id>".to_string()),
            ("list", []) => Ok(ShellCommand::List),
            ("records", []) => Ok(ShellCommand::Records),
            ("status", []) => Ok(ShellCommand::Status),
            ("stats", []) => Ok(ShellCommand::Stats),
            ("help", []) => Ok(ShellCommand::Help),
            ("stop" | "exit" | "quit", []) => Ok(ShellCommand::Stop),
            (other, _) => Err(format!("unknown command '{other}', type 'help'")),
        }
    }
}

pub struct Shell {
    simulator: Arc<Simulator>,
}

impl Shell {
    pub fn new(simulator: Arc<Simulator>) -> Self {
        Self { simulator }
    }

    /// Read commands until `stop` or end of input.
    pub async fn run<R, W>(&self, input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        output.write_all(HELP.as_bytes()).await?;
        output.flush().await?;

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let reply = match line.parse::<ShellCommand>() {
                Ok(ShellCommand::Stop) => {
                    output.write_all(b"Stopping\n").await?;
                    break;
                }
                Ok(command) => self.execute(command).await,
                Err(e) => format!("Error: {e}\n"),
            };
            output.write_all(reply.as_bytes()).await?;
            output.flush().await?;
        }

        output.flush().await?;
        Ok(())
    }

    /// Run one command and render its reply.
    pub async fn execute(&self, command: ShellCommand) -> String {
        let mut out = String::new();
        match command {
            ShellCommand::Add {
                id,
                material,
                est_time,
                priority,
            } => {
                let submitted = match Job::new(id, material, est_time, priority) {
                    Ok(job) => self.simulator.submit(job).await,
                    Err(e) => Err(e),
                };
                match submitted {
                    Ok(job) => push_line(
                        &mut out,
                        format!(
                            "Added job {}: {}, {}s, priority {}",
                            job.id(),
                            job.material(),
                            job.estimated_duration(),
                            job.priority()
                        ),
                    ),
                    Err(e) => push_line(&mut out, format!("Error: {e}")),
                }
            }
            ShellCommand::List => {
                let jobs = self.simulator.list_active().await;
                if jobs.is_empty() {
                    push_line(&mut out, "No active jobs");
                } else {
                    push_line(
                        &mut out,
                        format!("{:<12} {:<10} {:>8} {:>9}  STATUS", "ID", "MATERIAL", "TIME", "PRIORITY"),
                    );
                    for job in jobs {
                        push_line(
                            &mut out,
                            format!(
                                "{:<12} {:<10} {:>8.1} {:>9}  {}",
                                job.id(),
                                job.material(),
                                job.estimated_duration(),
                                job.priority(),
                                job.status()
                            ),
                        );
                    }
                }
            }
            ShellCommand::Records => {
                let records = self.simulator.list_records().await;
                if records.is_empty() {
                    push_line(&mut out, "No job records");
                } else {
                    push_line(
                        &mut out,
                        format!("{:<12} {:>9} {:<10} {:>10} {:>10}", "ID", "PRIORITY", "STATUS", "WAIT", "RUN"),
                    );
                    for record in records {
                        push_line(
                            &mut out,
                            format!(
                                "{:<12} {:>9} {:<10} {:>10.3} {:>10.3}",
                                record.job_id,
                                record.priority,
                                record.status.to_string(),
                                record.wait_time,
                                record.run_time
                            ),
                        );
                    }
                }
            }
            ShellCommand::Cancel(id) => {
                if self.simulator.cancel(&id).await {
                    push_line(&mut out, format!("Canceled job {id}"));
                } else {
                    push_line(&mut out, format!("Job {id} not found or no longer queued"));
                }
            }
            ShellCommand::Status => {
                let stats = self.simulator.queue_stats().await;
                push_line(
                    &mut out,
                    format!(
                        "Workers: {}  Active: {} (queued {}, running {})  Completed: {}  Canceled: {}  Failed: {}  Processed: {}",
                        self.simulator.num_workers(),
                        stats.active,
                        stats.queued,
                        stats.running,
                        stats.completed,
                        stats.canceled,
                        stats.failed,
                        stats.total_processed
                    ),
                );
            }
            ShellCommand::Stats => {
                let stats = self.simulator.global_stats().await;
                push_line(&mut out, format!("Average wait:    {:.3}s", stats.avg_wait_time));
                push_line(&mut out, format!("Median wait:     {:.3}s", stats.median_wait_time));
                push_line(&mut out, format!("Throughput:      {:.3} jobs/s", stats.throughput));
                push_line(&mut out, format!("Completed:       {}", stats.total_completed));
                push_line(&mut out, format!("Simulation time: {:.3}s", stats.total_simulation_time));
                for worker in stats.worker_utilization {
                    push_line(
                        &mut out,
                        format!(
                            "Worker {}: {:.1}% utilization",
                            worker.worker_id, worker.utilization_percent
                        ),
                    );
                }
            }
            ShellCommand::Help => out.push_str(HELP),
            ShellCommand::Stop => {}
        }
        out
    }
}

fn push_line(out: &mut String, line: impl AsRef<str>) {
    out.push_str(line.as_ref());
    out.push('\n');
}

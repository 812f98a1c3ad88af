//! Worker slots and simulated job execution.
//!
//! # Components
//!
//! - [`Worker`]: one execution slot; owns its job while it runs and
//!   accumulates busy time
//! - [`JobExecutor`]: turns a job's estimated duration into a scaled sleep
//!
//! # Execution Flow
//!
//! 1. The dispatch loop claims a job from the queue
//! 2. [`Worker::start_job`] takes ownership and starts the busy clock
//! 3. [`JobExecutor::execute`] sleeps for `estimated_duration * time_scale`
//! 4. [`Worker::finish_job`] stamps completion and releases the slot

pub mod executor;
pub mod slot;

pub use executor::JobExecutor;
pub use slot::{utilization, Worker, WorkerSnapshot};

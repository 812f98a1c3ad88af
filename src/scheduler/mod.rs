//! Job model and priority dispatch.
//!
//! - [`Job`] / [`JobRecord`]: a unit of work and its terminal archive entry
//! - [`JobQueue`]: heap + active map + record list, single-threaded
//! - [`DispatchQueue`]: the lock-guarded, awaitable front the worker loops use
//!
//! Dispatch order is (priority ascending, submission order ascending).

pub mod dispatch;
pub mod job;
pub mod queue;

pub use dispatch::DispatchQueue;
pub use job::{Job, JobRecord, JobSpec, JobStatus};
pub use queue::{JobQueue, QueueStats};

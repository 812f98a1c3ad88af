pub mod batch;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod history;
pub mod scheduler;
pub mod shell;
pub mod shutdown;
pub mod simulator;
pub mod stats;
pub mod worker;

pub use error::{FleetError, Result, ValidationError};
pub use simulator::Simulator;

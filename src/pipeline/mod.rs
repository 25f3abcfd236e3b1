//! Pipeline configuration and execution.

pub mod config;
pub mod runner;

pub use config::{InputFormat, RunConfig};
pub use runner::{Pipeline, PreparedData, RunOutcome};

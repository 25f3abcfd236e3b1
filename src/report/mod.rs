//! Run outputs: the per-class statistics report and the reduced matrix.

pub mod reduced;
pub mod stats;

pub use reduced::reduced_matrix;
pub use stats::{ClassSummary, FeatureStats, ReportFormat, StatsReport};

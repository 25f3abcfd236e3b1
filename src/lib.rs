//! Fizzy: feature selection plumbing for metagenomic abundance data.
//!
//! This library prepares sample × feature abundance matrices for an
//! information-theoretic feature selection engine and summarizes what the
//! engine picks.
//!
//! # Overview
//!
//! - **data**: Matrix loading (BIOM JSON, delimited text), mapping files, class labels
//! - **zero**: Pseudocount handling
//! - **normalize**: Relative abundance and discretization
//! - **select**: Selection methods, settings and the engine boundary
//! - **report**: Per-class statistics and the reduced matrix
//! - **pipeline**: Run configuration and execution
//!
//! # Example
//!
//! ```no_run
//! use fizzy::prelude::*;
//!
//! let mut config = RunConfig::new("table.biom", "Class", "selected.tsv");
//! config.mapping = Some("mapping.txt".into());
//! config.selection.method = SelectionMethod::Jmi;
//!
//! let engine = ExternalEngine::new("fizzy-engine");
//! let outcome = Pipeline::new(config).unwrap().execute(&engine).unwrap();
//! println!("{} features selected", outcome.selection.len());
//! ```

pub mod data;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod select;
pub mod zero;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::data::{
        read_delimited, resolve_labels, AbundanceTable, BiomDocument, ClassLabels, Feature,
        FeatureMatrix, LabelSource, MappingTable, MatrixType,
    };
    pub use crate::error::{FizzyError, Result};
    pub use crate::normalize::{discretize, relative_abundance, DiscreteMatrix};
    pub use crate::pipeline::{InputFormat, Pipeline, PreparedData, RunConfig, RunOutcome};
    pub use crate::report::{reduced_matrix, ReportFormat, StatsReport};
    pub use crate::select::{
        ExternalEngine, SelectionConfig, SelectionEngine, SelectionMethod, SelectionResult,
    };
    pub use crate::zero::add_pseudocount;
}

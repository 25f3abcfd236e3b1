//! Core data structures: abundance matrices, mapping tables and class labels.

pub mod biom;
pub mod delimited;
pub mod feature_matrix;
pub mod labels;
pub mod mapping;

pub use biom::{AbundanceTable, BiomDocument, BiomEntry, MatrixType, TAXONOMY_KEY};
pub use delimited::{read_delimited, read_delimited_from};
pub use feature_matrix::{Feature, FeatureMatrix};
pub use labels::{resolve_labels, ClassLabels, LabelSource};
pub use mapping::{LabelColumn, MappingTable, DEFAULT_ID_COLUMN, HEADER_MARKER};

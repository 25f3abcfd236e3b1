//! Abundance transforms.

pub mod discretize;
pub mod relative;

pub use discretize::{discretize, Binning, DiscreteMatrix};
pub use relative::relative_abundance;

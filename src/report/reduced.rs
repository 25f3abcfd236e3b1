//! Reduced matrix output: the selected features only, as relative abundance.

use crate::data::{BiomDocument, FeatureMatrix};
use crate::error::Result;
use serde_json::Value;

/// Build a dense BIOM document restricted to `indices`.
///
/// `relative` must be the relative-abundance view of the original counts.
/// Sample order, column metadata and per-feature row metadata carry over.
pub fn reduced_matrix(
    indices: &[usize],
    relative: &FeatureMatrix,
    sample_metadata: &[Option<Value>],
) -> Result<BiomDocument> {
    let subset = relative.subset_features(indices)?;
    Ok(BiomDocument::dense_from(&subset, sample_metadata))
}

//! Pseudocount addition for zero handling.

use crate::data::FeatureMatrix;
use crate::error::{FizzyError, Result};

/// Pseudocount added to raw counts before discretization.
pub const DISCRETIZE_PSEUDOCOUNT: f64 = 1.0;

/// Add a pseudocount to all entries.
///
/// The pseudocount is added to every entry (zero and non-zero) so that every
/// sample has a positive total and every relative abundance is non-zero.
///
/// # Arguments
/// * `matrix` - The abundance matrix
/// * `pseudocount` - Value to add (must be positive)
pub fn add_pseudocount(matrix: &FeatureMatrix, pseudocount: f64) -> Result<FeatureMatrix> {
    if pseudocount <= 0.0 || !pseudocount.is_finite() {
        return Err(FizzyError::InvalidArgument(
            "Pseudocount must be positive".to_string(),
        ));
    }

    matrix.with_data(matrix.data().add_scalar(pseudocount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Feature;
    use nalgebra::DMatrix;

    fn create_test_matrix() -> FeatureMatrix {
        // 3 samples × 2 features
        let data = DMatrix::from_row_slice(3, 2, &[10.0, 5.0, 20.0, 0.0, 0.0, 15.0]);
        let features = vec![Feature::from_id("A"), Feature::from_id("B")];
        let sample_ids = vec!["S1".into(), "S2".into(), "S3".into()];
        FeatureMatrix::new(data, sample_ids, features).unwrap()
    }

    #[test]
    fn test_add_pseudocount() {
        let counts = create_test_matrix();
        let result = add_pseudocount(&counts, 0.5).unwrap();

        assert_eq!(result.n_samples(), 3);
        assert_eq!(result.n_features(), 2);
        assert!((result.get(0, 0) - 10.5).abs() < 1e-10);
        assert!((result.get(2, 0) - 0.5).abs() < 1e-10); // was zero
        assert!((result.get(1, 1) - 0.5).abs() < 1e-10); // was zero

        // Input untouched
        assert_eq!(counts.get(2, 0), 0.0);
    }

    #[test]
    fn test_invalid_pseudocount() {
        let counts = create_test_matrix();
        assert!(add_pseudocount(&counts, 0.0).is_err());
        assert!(add_pseudocount(&counts, -1.0).is_err());
    }
}

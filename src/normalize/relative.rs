//! Relative abundance (total sum scaling).
//!
//! Each sample's abundances are divided by that sample's total, so every row
//! of the result sums to 1. This is the view reported to users; the selection
//! engine works on the discretized view instead.

use crate::data::FeatureMatrix;
use crate::error::{FizzyError, Result};
use nalgebra::DMatrix;
use rayon::prelude::*;

/// Convert a matrix to relative abundances, row by row.
///
/// # Formula
/// For sample i: RA(x_ij) = x_ij / sum_j(x_ij)
///
/// # Errors
/// A sample whose total is zero has no defined relative abundance and is
/// reported as [`FizzyError::Numerical`]. Callers that need every sample
/// should add a pseudocount first.
pub fn relative_abundance(matrix: &FeatureMatrix) -> Result<FeatureMatrix> {
    let n_samples = matrix.n_samples();
    let n_features = matrix.n_features();

    if n_samples == 0 || n_features == 0 {
        return Err(FizzyError::InvalidArgument(
            "Cannot compute relative abundance of an empty matrix".to_string(),
        ));
    }

    let totals = matrix.row_sums();
    for (i, &total) in totals.iter().enumerate() {
        if total == 0.0 {
            return Err(FizzyError::Numerical(format!(
                "Sample '{}' has zero total abundance, cannot normalize",
                matrix.sample_ids()[i]
            )));
        }
    }

    let normalized_rows: Vec<Vec<f64>> = (0..n_samples)
        .into_par_iter()
        .map(|i| {
            let total = totals[i];
            (0..n_features).map(|j| matrix.get(i, j) / total).collect()
        })
        .collect();

    let data = DMatrix::from_fn(n_samples, n_features, |i, j| normalized_rows[i][j]);
    matrix.with_data(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Feature;
    use approx::assert_relative_eq;

    fn create_test_counts() -> FeatureMatrix {
        // 4 samples × 3 features; each sample is 50% / 30% / 20%
        let data = DMatrix::from_row_slice(
            4,
            3,
            &[
                50.0, 30.0, 20.0, //
                100.0, 60.0, 40.0, //
                25.0, 15.0, 10.0, //
                500.0, 300.0, 200.0,
            ],
        );
        let features = vec![Feature::from_id("A"), Feature::from_id("B"), Feature::from_id("C")];
        let sample_ids = vec!["S1".into(), "S2".into(), "S3".into(), "S4".into()];
        FeatureMatrix::new(data, sample_ids, features).unwrap()
    }

    #[test]
    fn test_proportions() {
        let counts = create_test_counts();
        let ra = relative_abundance(&counts).unwrap();

        assert_eq!(ra.n_samples(), 4);
        assert_eq!(ra.n_features(), 3);
        for i in 0..4 {
            assert_relative_eq!(ra.get(i, 0), 0.50, epsilon = 1e-10);
            assert_relative_eq!(ra.get(i, 1), 0.30, epsilon = 1e-10);
            assert_relative_eq!(ra.get(i, 2), 0.20, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_rows_sum_to_one() {
        let data = DMatrix::from_row_slice(2, 4, &[3.0, 0.0, 7.0, 11.0, 1.0, 1.0, 1.0, 0.5]);
        let features = (0..4).map(|j| Feature::from_id(format!("F{}", j))).collect();
        let counts = FeatureMatrix::new(data, vec!["S1".into(), "S2".into()], features).unwrap();
        let ra = relative_abundance(&counts).unwrap();

        for total in ra.row_sums() {
            assert_relative_eq!(total, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_identifiers_preserved() {
        let counts = create_test_counts();
        let ra = relative_abundance(&counts).unwrap();
        assert_eq!(ra.sample_ids(), counts.sample_ids());
        assert_eq!(ra.features(), counts.features());
        // Source matrix untouched
        assert_eq!(counts.get(0, 0), 50.0);
    }

    #[test]
    fn test_zero_total_sample() {
        let data = DMatrix::from_row_slice(2, 2, &[10.0, 10.0, 0.0, 0.0]);
        let features = vec![Feature::from_id("A"), Feature::from_id("B")];
        let counts = FeatureMatrix::new(data, vec!["S1".into(), "S2".into()], features).unwrap();

        let err = relative_abundance(&counts).unwrap_err();
        assert!(matches!(err, FizzyError::Numerical(_)));
        assert!(err.to_string().contains("S2"));
    }

    #[test]
    fn test_empty_matrix() {
        let counts = FeatureMatrix::new(DMatrix::zeros(0, 0), vec![], vec![]).unwrap();
        assert!(relative_abundance(&counts).is_err());
    }
}

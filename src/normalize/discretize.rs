//! Discretized abundance for the selection engine.
//!
//! The engine's information-theoretic estimators need small integer codes, so
//! counts go through two stages:
//!
//! 1. pseudocount + relative abundance, then equal-width binning of every
//!    feature column over its own observed range, each value replaced by the
//!    lower edge of its bin;
//! 2. the whole binned matrix divided by its smallest nonzero value and
//!    rounded up.
//!
//! Reports never use this view.

use super::relative::relative_abundance;
use crate::data::FeatureMatrix;
use crate::error::{FizzyError, Result};
use crate::zero::pseudocount::{add_pseudocount, DISCRETIZE_PSEUDOCOUNT};
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::Serialize;

/// Equal-width bins spanning one feature column's observed range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Binning {
    /// Smallest observed value.
    pub min: f64,
    /// Largest observed value.
    pub max: f64,
    /// Number of bins.
    pub n_bins: usize,
}

impl Binning {
    /// Bins over the range of `values`. `n_bins` must be positive.
    pub fn from_values(values: &[f64], n_bins: usize) -> Self {
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        Self { min, max, n_bins }
    }

    /// Width of every bin; zero for a constant column.
    pub fn width(&self) -> f64 {
        (self.max - self.min) / self.n_bins as f64
    }

    /// Bin index of a value, clamped to `0..n_bins`.
    pub fn bin_of(&self, value: f64) -> usize {
        let width = self.width();
        if width <= 0.0 {
            return 0;
        }
        let idx = ((value - self.min) / width).floor();
        if idx <= 0.0 {
            0
        } else {
            (idx as usize).min(self.n_bins - 1)
        }
    }

    /// Lower edge of a bin.
    pub fn lower_edge(&self, bin: usize) -> f64 {
        self.min + bin as f64 * self.width()
    }
}

/// Integer-coded abundance matrix (samples × features).
#[derive(Debug, Clone)]
pub struct DiscreteMatrix {
    codes: DMatrix<u64>,
    binnings: Vec<Binning>,
    scale: f64,
}

impl DiscreteMatrix {
    /// Code for (sample, feature).
    #[inline]
    pub fn get(&self, sample: usize, feature: usize) -> u64 {
        self.codes[(sample, feature)]
    }

    #[inline]
    pub fn n_samples(&self) -> usize {
        self.codes.nrows()
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.codes.ncols()
    }

    /// Underlying code matrix.
    pub fn codes(&self) -> &DMatrix<u64> {
        &self.codes
    }

    /// Per-feature bins used for this matrix.
    pub fn binnings(&self) -> &[Binning] {
        &self.binnings
    }

    /// Smallest nonzero binned value, which maps to code 1.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Codes of one sample.
    pub fn row(&self, sample: usize) -> Vec<u64> {
        self.codes.row(sample).iter().copied().collect()
    }

    /// Codes of one feature.
    pub fn column(&self, feature: usize) -> Vec<u64> {
        self.codes.column(feature).iter().copied().collect()
    }
}

/// Discretize raw counts into integer codes for the selection engine.
///
/// # Arguments
/// * `counts` - Original (untransformed) counts
/// * `n_bins` - Number of equal-width bins per feature
pub fn discretize(counts: &FeatureMatrix, n_bins: usize) -> Result<DiscreteMatrix> {
    if n_bins == 0 {
        return Err(FizzyError::InvalidArgument(
            "Number of bins must be positive".to_string(),
        ));
    }

    let shifted = add_pseudocount(counts, DISCRETIZE_PSEUDOCOUNT)?;
    let relative = relative_abundance(&shifted)?;
    let n_samples = relative.n_samples();
    let n_features = relative.n_features();

    let (binnings, binned): (Vec<Binning>, Vec<Vec<f64>>) = (0..n_features)
        .into_par_iter()
        .map(|j| {
            let column = relative.column(j);
            let binning = Binning::from_values(&column, n_bins);
            let edges = column
                .iter()
                .map(|&v| binning.lower_edge(binning.bin_of(v)))
                .collect();
            (binning, edges)
        })
        .unzip();

    let scale = binned
        .iter()
        .flatten()
        .copied()
        .filter(|&v| v > 0.0)
        .fold(f64::INFINITY, f64::min);
    if !scale.is_finite() {
        return Err(FizzyError::Numerical(
            "Binned matrix has no nonzero value to rescale by".to_string(),
        ));
    }

    let codes = DMatrix::from_fn(n_samples, n_features, |i, j| {
        (binned[j][i] / scale).ceil() as u64
    });

    log::debug!(
        "Discretized {} samples x {} features into {} bins (scale {:e})",
        n_samples,
        n_features,
        n_bins,
        scale
    );

    Ok(DiscreteMatrix {
        codes,
        binnings,
        scale,
    })
}

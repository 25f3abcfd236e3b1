//! Dense abundance matrix with samples as rows and features as columns.

use crate::error::{FizzyError, Result};
use nalgebra::DMatrix;
use serde_json::Value;

/// A feature (taxon) column of a [`FeatureMatrix`].
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Identifier as it appears in the source file.
    pub id: String,
    /// Human-readable label: the serialized taxonomy, or the identifier.
    pub label: String,
    /// Raw row metadata from the source document, if any.
    pub metadata: Option<Value>,
}

impl Feature {
    /// Create a feature with an explicit label and no metadata.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            metadata: None,
        }
    }

    /// Create a feature whose label is its identifier.
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            metadata: None,
        }
    }

    /// Attach the raw row metadata.
    pub fn with_metadata(mut self, metadata: Option<Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A dense abundance matrix.
///
/// Rows represent samples, columns represent features. Dimensions are fixed
/// at construction; transforms return new matrices instead of mutating.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    /// Values (samples × features).
    data: DMatrix<f64>,
    /// Sample identifiers (row names).
    sample_ids: Vec<String>,
    /// Features (column descriptors).
    features: Vec<Feature>,
}

impl FeatureMatrix {
    /// Create a matrix from sample-major data and its identifiers.
    pub fn new(data: DMatrix<f64>, sample_ids: Vec<String>, features: Vec<Feature>) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != sample_ids.len() {
            return Err(FizzyError::InvalidArgument(format!(
                "matrix has {} rows but {} sample identifiers",
                nrows,
                sample_ids.len()
            )));
        }
        if ncols != features.len() {
            return Err(FizzyError::InvalidArgument(format!(
                "matrix has {} columns but {} features",
                ncols,
                features.len()
            )));
        }
        Ok(Self {
            data,
            sample_ids,
            features,
        })
    }

    /// Create a matrix from feature-major data (features × samples).
    ///
    /// Every loader assembles its values feature-major and goes through this
    /// single transpose.
    pub fn from_feature_major(
        data: DMatrix<f64>,
        sample_ids: Vec<String>,
        features: Vec<Feature>,
    ) -> Result<Self> {
        Self::new(data.transpose(), sample_ids, features)
    }

    /// Build a new matrix with the same identifiers and different values.
    pub fn with_data(&self, data: DMatrix<f64>) -> Result<Self> {
        Self::new(data, self.sample_ids.clone(), self.features.clone())
    }

    /// Value for (sample, feature).
    #[inline]
    pub fn get(&self, sample: usize, feature: usize) -> f64 {
        self.data[(sample, feature)]
    }

    /// Number of samples (rows).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    /// Number of features (columns).
    #[inline]
    pub fn n_features(&self) -> usize {
        self.data.ncols()
    }

    /// Sample identifiers, aligned with rows.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Features, aligned with columns.
    #[inline]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Feature identifiers, aligned with columns.
    pub fn feature_ids(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.id.as_str()).collect()
    }

    /// Underlying matrix.
    #[inline]
    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Number of non-zero entries.
    pub fn nnz(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0.0).count()
    }

    /// Total abundance per sample.
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.n_samples()).map(|i| self.data.row(i).sum()).collect()
    }

    /// Values of one feature across all samples.
    pub fn column(&self, feature: usize) -> Vec<f64> {
        self.data.column(feature).iter().copied().collect()
    }

    /// Restrict the matrix to the given features, in the given order.
    pub fn subset_features(&self, indices: &[usize]) -> Result<Self> {
        let mut features = Vec::with_capacity(indices.len());
        for &idx in indices {
            let feature = self.features.get(idx).ok_or_else(|| {
                FizzyError::InvalidArgument(format!("Feature index {} out of bounds", idx))
            })?;
            features.push(feature.clone());
        }
        let data = self.data.select_columns(indices);
        Self::new(data, self.sample_ids.clone(), features)
    }
}

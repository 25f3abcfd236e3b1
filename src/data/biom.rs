//! Reading and writing BIOM (JSON) tables.
//!
//! A BIOM document stores features as rows and samples as columns, either
//! densely (`data` is one array per feature) or sparsely (`data` is a list of
//! `[feature, sample, value]` triples). Both encodings are assembled
//! feature-major and then transposed once into a sample-major
//! [`FeatureMatrix`].

use super::feature_matrix::{Feature, FeatureMatrix};
use crate::error::{FizzyError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sprs::{CsMat, TriMat};
use std::fs;
use std::path::Path;

/// Keys a BIOM document must carry.
const REQUIRED_KEYS: [&str; 5] = ["matrix_type", "shape", "data", "rows", "columns"];

/// Metadata key holding a feature's taxonomy.
pub const TAXONOMY_KEY: &str = "taxonomy";

/// Storage layout of the `data` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatrixType {
    Sparse,
    Dense,
}

/// A row (feature) or column (sample) descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomEntry {
    pub id: String,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// The on-disk BIOM document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiomDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_url: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub table_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub matrix_type: MatrixType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix_element_type: Option<String>,
    /// `[n_features, n_samples]`.
    pub shape: [usize; 2],
    pub data: Vec<Vec<f64>>,
    pub rows: Vec<BiomEntry>,
    pub columns: Vec<BiomEntry>,
}

impl BiomDocument {
    /// Parse a document from JSON text. `file` names the source in errors.
    pub fn from_json_str(text: &str, file: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| FizzyError::malformed(file, e.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| FizzyError::malformed(file, "top level is not a JSON object"))?;
        for key in REQUIRED_KEYS {
            if !object.contains_key(key) {
                return Err(FizzyError::schema(
                    file,
                    format!("missing required key '{}'", key),
                ));
            }
        }
        check_shape(&object["shape"], file)?;
        serde_json::from_value(value).map_err(|e| FizzyError::malformed(file, e.to_string()))
    }

    /// Load a document from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(FizzyError::io_at(path))?;
        Self::from_json_str(&text, &path.display().to_string())
    }

    /// Build a dense document from a matrix and its per-sample metadata.
    ///
    /// Values are written feature-major, as BIOM expects.
    pub fn dense_from(matrix: &FeatureMatrix, sample_metadata: &[Option<Value>]) -> Self {
        let data = (0..matrix.n_features()).map(|j| matrix.column(j)).collect();
        let rows = matrix
            .features()
            .iter()
            .map(|f| BiomEntry {
                id: f.id.clone(),
                metadata: row_metadata(f),
            })
            .collect();
        let columns = matrix
            .sample_ids()
            .iter()
            .enumerate()
            .map(|(i, id)| BiomEntry {
                id: id.clone(),
                metadata: sample_metadata.get(i).cloned().flatten(),
            })
            .collect();

        Self {
            id: None,
            format: Some("Biological Observation Matrix 1.0.0".to_string()),
            format_url: Some("http://biom-format.org".to_string()),
            table_type: Some("OTU table".to_string()),
            generated_by: Some(format!("fizzy {}", env!("CARGO_PKG_VERSION"))),
            date: Some(chrono::Utc::now().to_rfc3339()),
            matrix_type: MatrixType::Dense,
            matrix_element_type: Some("float".to_string()),
            shape: [matrix.n_features(), matrix.n_samples()],
            data,
            rows,
            columns,
        }
    }

    /// Serialize to JSON text.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// `shape` must be exactly two non-negative integers.
fn check_shape(shape: &Value, file: &str) -> Result<()> {
    let valid = shape
        .as_array()
        .is_some_and(|dims| dims.len() == 2 && dims.iter().all(|d| d.as_u64().is_some()));
    if valid {
        Ok(())
    } else {
        Err(FizzyError::schema(
            file,
            format!("'shape' must be [n_features, n_samples], got {}", shape),
        ))
    }
}

/// Row metadata to write for a feature.
///
/// Features loaded without metadata but with a distinct label (delimited
/// input) carry the label out as their taxonomy.
fn row_metadata(feature: &Feature) -> Option<Value> {
    match &feature.metadata {
        Some(meta) => Some(meta.clone()),
        None if feature.label != feature.id => Some(json!({ TAXONOMY_KEY: feature.label })),
        None => None,
    }
}

/// An abundance matrix together with the per-sample metadata it was loaded with.
#[derive(Debug, Clone)]
pub struct AbundanceTable {
    /// Samples × features values.
    pub matrix: FeatureMatrix,
    /// Column metadata, aligned with matrix rows. `None` where absent.
    pub sample_metadata: Vec<Option<Value>>,
}

impl AbundanceTable {
    /// Wrap a matrix that has no sample metadata.
    pub fn without_metadata(matrix: FeatureMatrix) -> Self {
        let sample_metadata = vec![None; matrix.n_samples()];
        Self {
            matrix,
            sample_metadata,
        }
    }

    /// Load a table from a BIOM JSON file.
    pub fn from_biom<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let document = BiomDocument::from_json_file(path)?;
        Self::from_document(document, &path.display().to_string())
    }

    /// Reconstruct the matrix described by a document.
    pub fn from_document(document: BiomDocument, file: &str) -> Result<Self> {
        let [n_features, n_samples] = document.shape;
        if document.rows.len() != n_features {
            return Err(FizzyError::schema(
                file,
                format!(
                    "shape declares {} features but 'rows' has {} entries",
                    n_features,
                    document.rows.len()
                ),
            ));
        }
        if document.columns.len() != n_samples {
            return Err(FizzyError::schema(
                file,
                format!(
                    "shape declares {} samples but 'columns' has {} entries",
                    n_samples,
                    document.columns.len()
                ),
            ));
        }

        let values = match document.matrix_type {
            MatrixType::Dense => dense_values(&document.data, n_features, n_samples, file)?,
            MatrixType::Sparse => sparse_values(&document.data, n_features, n_samples, file)?,
        };

        let features = document.rows.into_iter().map(feature_from_entry).collect();
        let (sample_ids, sample_metadata): (Vec<String>, Vec<Option<Value>>) = document
            .columns
            .into_iter()
            .map(|c| (c.id, c.metadata))
            .unzip();

        let matrix = FeatureMatrix::from_feature_major(values, sample_ids, features)?;
        Ok(Self {
            matrix,
            sample_metadata,
        })
    }
}

/// Feature-major values of a dense payload.
fn dense_values(
    data: &[Vec<f64>],
    n_features: usize,
    n_samples: usize,
    file: &str,
) -> Result<DMatrix<f64>> {
    if data.len() != n_features {
        return Err(FizzyError::schema(
            file,
            format!(
                "dense data has {} rows, shape declares {}",
                data.len(),
                n_features
            ),
        ));
    }
    for (i, row) in data.iter().enumerate() {
        if row.len() != n_samples {
            return Err(FizzyError::schema(
                file,
                format!(
                    "dense data row {} has {} values, shape declares {}",
                    i,
                    row.len(),
                    n_samples
                ),
            ));
        }
    }
    Ok(DMatrix::from_fn(n_features, n_samples, |i, j| data[i][j]))
}

/// Feature-major values of a sparse payload. Duplicate coordinates accumulate.
fn sparse_values(
    data: &[Vec<f64>],
    n_features: usize,
    n_samples: usize,
    file: &str,
) -> Result<DMatrix<f64>> {
    let mut tri_mat = TriMat::new((n_features, n_samples));
    for (pos, entry) in data.iter().enumerate() {
        let (f, s, value) = match entry.as_slice() {
            [f, s, v] => (*f, *s, *v),
            _ => {
                return Err(FizzyError::schema(
                    file,
                    format!(
                        "sparse entry {} has {} elements, expected 3",
                        pos,
                        entry.len()
                    ),
                ))
            }
        };
        let row = checked_index(f, n_features, "feature", pos, file)?;
        let col = checked_index(s, n_samples, "sample", pos, file)?;
        tri_mat.add_triplet(row, col, value);
    }

    let csr: CsMat<f64> = tri_mat.to_csr();
    let mut dense = DMatrix::zeros(n_features, n_samples);
    for (row, row_vec) in csr.outer_iterator().enumerate() {
        for (col, &val) in row_vec.iter() {
            dense[(row, col)] = val;
        }
    }
    Ok(dense)
}

fn checked_index(raw: f64, bound: usize, axis: &str, pos: usize, file: &str) -> Result<usize> {
    if !raw.is_finite() || raw < 0.0 || raw.fract() != 0.0 {
        return Err(FizzyError::schema(
            file,
            format!("sparse entry {}: {} index {} is not a valid index", pos, axis, raw),
        ));
    }
    let idx = raw as usize;
    if idx >= bound {
        return Err(FizzyError::schema(
            file,
            format!(
                "sparse entry {}: {} index {} outside declared shape ({} {}s)",
                pos, axis, idx, bound, axis
            ),
        ));
    }
    Ok(idx)
}

fn feature_from_entry(entry: BiomEntry) -> Feature {
    let label = entry
        .metadata
        .as_ref()
        .and_then(|m| m.get(TAXONOMY_KEY))
        .and_then(taxonomy_label)
        .unwrap_or_else(|| entry.id.clone());
    Feature::new(entry.id, label).with_metadata(entry.metadata)
}

/// Serialize a taxonomy value into a single label.
fn taxonomy_label(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(levels) if levels.is_empty() => None,
        Value::Array(levels) => Some(
            levels
                .iter()
                .map(|level| match level {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("; "),
        ),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn dense_json() -> String {
        r#"{
            "id": null,
            "format": "Biological Observation Matrix 1.0.0",
            "matrix_type": "dense",
            "shape": [3, 4],
            "data": [[10, 20, 30, 40],
                     [0, 5, 0, 5],
                     [1, 1, 1, 1]],
            "rows": [
                {"id": "OTU1", "metadata": {"taxonomy": ["k__Bacteria", "p__Firmicutes"]}},
                {"id": "OTU2", "metadata": null},
                {"id": "OTU3", "metadata": {"taxonomy": "k__Archaea"}}
            ],
            "columns": [
                {"id": "S1", "metadata": {"Class": "A"}},
                {"id": "S2", "metadata": {"Class": "A"}},
                {"id": "S3", "metadata": {"Class": "B"}},
                {"id": "S4", "metadata": {"Class": "B"}}
            ]
        }"#
        .to_string()
    }

    fn sparse_json(data: &str) -> String {
        format!(
            r#"{{
                "matrix_type": "sparse",
                "shape": [2, 3],
                "data": {},
                "rows": [{{"id": "F1", "metadata": null}}, {{"id": "F2", "metadata": null}}],
                "columns": [{{"id": "S1"}}, {{"id": "S2"}}, {{"id": "S3"}}]
            }}"#,
            data
        )
    }

    fn load(text: &str) -> Result<AbundanceTable> {
        let doc = BiomDocument::from_json_str(text, "test.biom")?;
        AbundanceTable::from_document(doc, "test.biom")
    }

    #[test]
    fn test_dense_shape_is_transposed() {
        let table = load(&dense_json()).unwrap();
        assert_eq!(table.matrix.n_samples(), 4);
        assert_eq!(table.matrix.n_features(), 3);
        assert_eq!(table.matrix.sample_ids(), &["S1", "S2", "S3", "S4"]);
        assert_eq!(table.matrix.get(3, 0), 40.0);
        assert_eq!(table.matrix.get(1, 1), 5.0);
    }

    #[test]
    fn test_feature_labels() {
        let table = load(&dense_json()).unwrap();
        let features = table.matrix.features();
        assert_eq!(features[0].label, "k__Bacteria; p__Firmicutes");
        assert_eq!(features[1].label, "OTU2");
        assert_eq!(features[2].label, "k__Archaea");
        assert_eq!(table.matrix.feature_ids(), vec!["OTU1", "OTU2", "OTU3"]);
    }

    #[test]
    fn test_sample_metadata_retained() {
        let table = load(&dense_json()).unwrap();
        assert_eq!(table.sample_metadata.len(), 4);
        let meta = table.sample_metadata[2].as_ref().unwrap();
        assert_eq!(meta["Class"], "B");
    }

    #[test]
    fn test_sparse_scatter() {
        let table = load(&sparse_json("[[0, 0, 5.0], [1, 2, 7.5], [0, 1, 2]]")).unwrap();
        let m = &table.matrix;
        assert_eq!(m.n_samples(), 3);
        assert_eq!(m.n_features(), 2);
        assert_eq!(m.get(0, 0), 5.0);
        assert_eq!(m.get(2, 1), 7.5);
        assert_eq!(m.get(1, 0), 2.0);
        assert_eq!(m.get(0, 1), 0.0);
        assert_eq!(m.get(1, 1), 0.0);
        assert_eq!(m.get(2, 0), 0.0);
        assert_eq!(m.nnz(), 3);
    }

    #[test]
    fn test_sparse_out_of_bounds_is_schema_violation() {
        let err = load(&sparse_json("[[0, 3, 1.0]]")).unwrap_err();
        assert!(matches!(err, FizzyError::SchemaViolation { .. }));
        assert!(err.to_string().contains("sample index 3"));

        let err = load(&sparse_json("[[2, 0, 1.0]]")).unwrap_err();
        assert!(matches!(err, FizzyError::SchemaViolation { .. }));
    }

    #[test]
    fn test_sparse_bad_triple() {
        let err = load(&sparse_json("[[0, 1]]")).unwrap_err();
        assert!(matches!(err, FizzyError::SchemaViolation { .. }));

        let err = load(&sparse_json("[[0.5, 1, 2.0]]")).unwrap_err();
        assert!(matches!(err, FizzyError::SchemaViolation { .. }));
    }

    #[test]
    fn test_missing_key_is_schema_violation() {
        let text = r#"{"matrix_type": "dense", "shape": [0, 0], "rows": [], "columns": []}"#;
        let err = load(text).unwrap_err();
        assert!(matches!(err, FizzyError::SchemaViolation { .. }));
        assert!(err.to_string().contains("'data'"));
    }

    #[test]
    fn test_bad_shape_is_schema_violation() {
        for shape in ["[3]", "[3, 2, 1]", "[-1, 2]", "\"3x2\""] {
            let text = format!(
                r#"{{"matrix_type": "dense", "shape": {}, "data": [], "rows": [], "columns": []}}"#,
                shape
            );
            let err = load(&text).unwrap_err();
            assert!(matches!(err, FizzyError::SchemaViolation { .. }), "shape {}", shape);
            assert!(err.to_string().contains("shape"));
        }
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = AbundanceTable::from_biom("/nonexistent/table.biom").unwrap_err();
        assert!(matches!(err, FizzyError::FileIo { .. }));
        assert!(err.to_string().contains("table.biom"));
    }

    #[test]
    fn test_not_json_is_malformed() {
        let err = load("this is not json").unwrap_err();
        assert!(matches!(err, FizzyError::MalformedInput { .. }));
        assert!(err.to_string().contains("test.biom"));
    }

    #[test]
    fn test_unknown_matrix_type_is_malformed() {
        let text = dense_json().replace("\"dense\"", "\"banded\"");
        assert!(matches!(load(&text), Err(FizzyError::MalformedInput { .. })));
    }

    #[test]
    fn test_dense_row_length_mismatch() {
        let text = dense_json().replace("[1, 1, 1, 1]", "[1, 1, 1]");
        assert!(matches!(load(&text), Err(FizzyError::SchemaViolation { .. })));
    }

    #[test]
    fn test_rows_shape_mismatch() {
        let text = dense_json().replace("[3, 4]", "[2, 4]");
        assert!(matches!(load(&text), Err(FizzyError::SchemaViolation { .. })));
    }

    #[test]
    fn test_dense_document_reloads() {
        let table = load(&dense_json()).unwrap();
        let subset = table.matrix.subset_features(&[2, 0]).unwrap();
        let doc = BiomDocument::dense_from(&subset, &table.sample_metadata);
        assert_eq!(doc.shape, [2, 4]);
        assert_eq!(doc.matrix_type, MatrixType::Dense);

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", doc.to_json_string().unwrap()).unwrap();
        file.flush().unwrap();

        let reloaded = AbundanceTable::from_biom(file.path()).unwrap();
        assert_eq!(reloaded.matrix.n_features(), 2);
        assert_eq!(reloaded.matrix.sample_ids(), table.matrix.sample_ids());
        assert_eq!(reloaded.matrix.features()[0].label, "k__Archaea");
        assert_eq!(reloaded.matrix.features()[1].label, "k__Bacteria; p__Firmicutes");
        assert_eq!(reloaded.sample_metadata, table.sample_metadata);
        assert_eq!(reloaded.matrix.get(3, 1), 40.0);
    }
}

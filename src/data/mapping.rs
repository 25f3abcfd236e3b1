//! Sample mapping (metadata) files.
//!
//! A mapping file is tab-delimited. The header line starts with `#` and must
//! name the sample-identifier column; every other column is a named field.
//! Later lines starting with `#` are comments.

use crate::error::{FizzyError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Conventional name of the sample-identifier column.
pub const DEFAULT_ID_COLUMN: &str = "SampleID";

/// Marker that opens the header line.
pub const HEADER_MARKER: char = '#';

/// Sample metadata keyed by sample identifier.
#[derive(Debug, Clone)]
pub struct MappingTable {
    /// Source name, for error messages.
    source_name: String,
    /// Sample IDs in file order.
    sample_ids: Vec<String>,
    /// Column names in header order (marker stripped).
    column_names: Vec<String>,
    /// Data stored as sample_id -> column_name -> value.
    data: HashMap<String, HashMap<String, String>>,
}

impl MappingTable {
    /// Load a mapping table from a TSV file.
    pub fn from_tsv<P: AsRef<Path>>(path: P, id_column: &str) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(FizzyError::io_at(path))?;
        Self::from_reader(BufReader::new(file), id_column, &path.display().to_string())
    }

    /// Parse a mapping table. `name` identifies the source in errors.
    pub fn from_reader<R: BufRead>(reader: R, id_column: &str, name: &str) -> Result<Self> {
        let id_column = id_column.trim_start_matches(HEADER_MARKER);
        let mut header: Option<(Vec<String>, usize)> = None;
        let mut sample_ids = Vec::new();
        let mut data = HashMap::new();

        for (idx, line_result) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line_result.map_err(FizzyError::io_at(name))?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let (columns, id_idx) = match &header {
                None => {
                    let rest = line.strip_prefix(HEADER_MARKER).ok_or_else(|| {
                        FizzyError::schema(
                            name,
                            format!(
                                "line {}: header line must start with '{}'",
                                line_no, HEADER_MARKER
                            ),
                        )
                    })?;
                    let columns: Vec<String> =
                        rest.split('\t').map(|s| s.trim().to_string()).collect();
                    let id_idx = columns.iter().position(|c| c == id_column).ok_or_else(|| {
                        FizzyError::schema(
                            name,
                            format!(
                                "line {}: header has no sample identifier column '{}'",
                                line_no, id_column
                            ),
                        )
                    })?;
                    header = Some((columns, id_idx));
                    continue;
                }
                Some(h) => h,
            };

            if line.starts_with(HEADER_MARKER) {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != columns.len() {
                return Err(FizzyError::schema(
                    name,
                    format!(
                        "line {}: expected {} fields, found {}",
                        line_no,
                        columns.len(),
                        fields.len()
                    ),
                ));
            }

            let sample_id = fields[*id_idx].trim().to_string();
            if sample_id.is_empty() {
                return Err(FizzyError::schema(
                    name,
                    format!("line {}: empty sample identifier", line_no),
                ));
            }
            if data.contains_key(&sample_id) {
                return Err(FizzyError::schema(
                    name,
                    format!("line {}: duplicate sample identifier '{}'", line_no, sample_id),
                ));
            }

            let record: HashMap<String, String> = columns
                .iter()
                .zip(&fields)
                .map(|(col, value)| (col.clone(), value.trim().to_string()))
                .collect();
            sample_ids.push(sample_id.clone());
            data.insert(sample_id, record);
        }

        let (column_names, _) =
            header.ok_or_else(|| FizzyError::schema(name, "no header line found"))?;
        if sample_ids.is_empty() {
            return Err(FizzyError::schema(name, "no sample rows after the header"));
        }

        Ok(Self {
            source_name: name.to_string(),
            sample_ids,
            column_names,
            data,
        })
    }

    /// Sample IDs in file order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Column names, including the identifier column.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Get a field value for a specific sample.
    pub fn get(&self, sample_id: &str, field: &str) -> Option<&str> {
        self.data
            .get(sample_id)
            .and_then(|m| m.get(field))
            .map(String::as_str)
    }

    /// Check if a sample exists.
    pub fn has_sample(&self, sample_id: &str) -> bool {
        self.data.contains_key(sample_id)
    }

    /// Check if a column exists.
    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    /// Resolve one field for every sample.
    ///
    /// Fails immediately if the header does not contain `field`.
    pub fn label_column(&self, field: &str) -> Result<LabelColumn> {
        if !self.has_column(field) {
            return Err(FizzyError::schema(
                &self.source_name,
                format!("no column named '{}'", field),
            ));
        }
        let labels = self
            .data
            .iter()
            .map(|(sample, record)| {
                let value = record.get(field).filter(|v| !v.is_empty()).cloned();
                (sample.clone(), value)
            })
            .collect();
        Ok(LabelColumn {
            field: field.to_string(),
            labels,
        })
    }
}

/// A single mapping field resolved for every sample in the table.
#[derive(Debug, Clone)]
pub struct LabelColumn {
    field: String,
    /// sample_id -> value; `None` where the value is empty.
    labels: HashMap<String, Option<String>>,
}

impl LabelColumn {
    /// Name of the resolved field.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Label of a sample, or a referential mismatch naming it.
    pub fn label_of(&self, sample_id: &str) -> Result<&str> {
        match self.labels.get(sample_id) {
            None => Err(FizzyError::mismatch(sample_id, "not present in the mapping file")),
            Some(None) => Err(FizzyError::mismatch(
                sample_id,
                format!("mapping record has no value for '{}'", self.field),
            )),
            Some(Some(label)) => Ok(label.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(text: &str) -> Result<MappingTable> {
        MappingTable::from_reader(text.as_bytes(), DEFAULT_ID_COLUMN, "map.txt")
    }

    fn create_test_tsv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "#SampleID\tBarcodeSequence\tClass\tDescription").unwrap();
        writeln!(file, "#collected spring 2014").unwrap();
        writeln!(file, "S1\tAACG\tcontrol\tfirst").unwrap();
        writeln!(file, "S2\tAACT\ttreatment\tsecond").unwrap();
        writeln!(file, "S3\tAAGG\tcontrol\tthird").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_mapping() {
        let file = create_test_tsv();
        let map = MappingTable::from_tsv(file.path(), DEFAULT_ID_COLUMN).unwrap();

        assert_eq!(map.n_samples(), 3);
        assert_eq!(map.sample_ids(), &["S1", "S2", "S3"]);
        assert_eq!(
            map.column_names(),
            &["SampleID", "BarcodeSequence", "Class", "Description"]
        );
        assert_eq!(map.get("S2", "Class"), Some("treatment"));
        assert!(map.has_sample("S3"));
        assert!(!map.has_sample("S4"));
    }

    #[test]
    fn test_id_column_accepts_marker() {
        let map = MappingTable::from_reader(
            "#SampleID\tClass\nS1\tA\n".as_bytes(),
            "#SampleID",
            "map.txt",
        )
        .unwrap();
        assert_eq!(map.get("S1", "Class"), Some("A"));
    }

    #[test]
    fn test_missing_marker() {
        let err = parse("SampleID\tClass\nS1\tA\n").unwrap_err();
        assert!(matches!(err, FizzyError::SchemaViolation { .. }));
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_missing_id_column() {
        let err = parse("#Sample\tClass\nS1\tA\n").unwrap_err();
        assert!(matches!(err, FizzyError::SchemaViolation { .. }));
        assert!(err.to_string().contains("SampleID"));
    }

    #[test]
    fn test_malformed_row_reports_line() {
        let err = parse("#SampleID\tClass\nS1\tA\nS2\tB\textra\n").unwrap_err();
        assert!(matches!(err, FizzyError::SchemaViolation { .. }));
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_duplicate_sample() {
        let err = parse("#SampleID\tClass\nS1\tA\nS1\tB\n").unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_no_rows() {
        assert!(parse("#SampleID\tClass\n").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_label_column_missing_field_fails_eagerly() {
        let map = parse("#SampleID\tClass\nS1\tA\n").unwrap();
        let err = map.label_column("Treatment").unwrap_err();
        assert!(matches!(err, FizzyError::SchemaViolation { .. }));
        assert!(err.to_string().contains("Treatment"));
    }

    #[test]
    fn test_label_column_lookup() {
        let map = parse("#SampleID\tClass\nS1\tA\nS2\t\n").unwrap();
        let labels = map.label_column("Class").unwrap();
        assert_eq!(labels.field(), "Class");
        assert_eq!(labels.label_of("S1").unwrap(), "A");

        let err = labels.label_of("S2").unwrap_err();
        assert!(matches!(err, FizzyError::ReferentialMismatch { .. }));

        let err = labels.label_of("S9").unwrap_err();
        assert!(err.to_string().contains("S9"));
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = MappingTable::from_tsv("/nonexistent/mapping.txt", DEFAULT_ID_COLUMN).unwrap_err();
        assert!(matches!(err, FizzyError::FileIo { .. }));
        assert!(err.to_string().contains("mapping.txt"));
    }
}

//! Run configuration.

use crate::data::DEFAULT_ID_COLUMN;
use crate::error::{FizzyError, Result};
use crate::report::ReportFormat;
use crate::select::SelectionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Encoding of the abundance matrix file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// BIOM JSON, dense or sparse.
    #[default]
    Biom,
    /// Delimited text, sample identifiers in the first row.
    Delimited,
}

fn default_delimiter() -> char {
    ','
}

fn default_id_column() -> String {
    DEFAULT_ID_COLUMN.to_string()
}

fn default_n_bins() -> usize {
    10
}

/// Everything needed for one selection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Abundance matrix file.
    pub input: PathBuf,
    #[serde(default)]
    pub input_format: InputFormat,
    /// Field delimiter for delimited input.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Mapping file; without one, labels come from the matrix's column metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<PathBuf>,
    /// Sample identifier column of the mapping file.
    #[serde(default = "default_id_column")]
    pub sample_id_column: String,
    /// Metadata field holding the class label.
    pub label_field: String,
    pub selection: SelectionConfig,
    /// Bins per feature for discretization.
    #[serde(default = "default_n_bins")]
    pub n_bins: usize,
    /// Report file.
    pub output: PathBuf,
    #[serde(default)]
    pub output_format: ReportFormat,
    /// Reduced matrix file, if wanted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduced_output: Option<PathBuf>,
}

impl RunConfig {
    /// Create a configuration with default settings.
    pub fn new(input: impl Into<PathBuf>, label_field: &str, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            input_format: InputFormat::default(),
            delimiter: default_delimiter(),
            mapping: None,
            sample_id_column: default_id_column(),
            label_field: label_field.to_string(),
            selection: SelectionConfig::default(),
            n_bins: default_n_bins(),
            output: output.into(),
            output_format: ReportFormat::default(),
            reduced_output: None,
        }
    }

    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(FizzyError::from)
    }

    /// Load from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(FizzyError::io_at(path))?;
        Self::from_yaml(&text)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(FizzyError::from)
    }

    /// Delimiter as a single byte.
    pub fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(FizzyError::InvalidArgument(format!(
                "Delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            )))
        }
    }

    /// Reject settings no run could succeed with.
    pub fn validate(&self) -> Result<()> {
        self.selection.validate()?;
        if self.n_bins == 0 {
            return Err(FizzyError::InvalidArgument(
                "Number of bins must be positive".to_string(),
            ));
        }
        if self.label_field.trim().is_empty() {
            return Err(FizzyError::InvalidArgument(
                "Label field must not be empty".to_string(),
            ));
        }
        self.delimiter_byte()?;
        Ok(())
    }
}

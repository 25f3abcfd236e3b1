//! Per-class statistics of the selected features.

use crate::data::{ClassLabels, FeatureMatrix};
use crate::error::{FizzyError, Result};
use crate::normalize::relative_abundance;
use crate::select::SelectionResult;
use csv::{Terminator, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Output format of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Tab-separated table.
    #[default]
    Tsv,
    /// JSON document.
    Json,
    /// YAML document.
    Yaml,
}

/// Relative abundance summary of one feature within one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSummary {
    pub class: String,
    pub mean: f64,
    pub std: f64,
}

/// Report row for one selected feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    /// Feature label (taxonomy or identifier).
    pub feature: String,
    /// Feature identifier.
    pub feature_id: String,
    /// Column of the feature in the original matrix.
    pub index: usize,
    /// One entry per class, in class-code order.
    pub classes: Vec<ClassSummary>,
}

/// Statistics of the selected features, in selection order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    /// Class labels in class-code order.
    pub classes: Vec<String>,
    pub features: Vec<FeatureStats>,
}

impl StatsReport {
    /// Build the report from the original counts.
    pub fn build(
        selection: &SelectionResult,
        counts: &FeatureMatrix,
        labels: &ClassLabels,
    ) -> Result<Self> {
        let relative = relative_abundance(counts)?;
        Self::from_relative(selection.indices(), &relative, labels)
    }

    /// Build the report from an already normalized matrix.
    pub fn from_relative(
        indices: &[usize],
        relative: &FeatureMatrix,
        labels: &ClassLabels,
    ) -> Result<Self> {
        if labels.n_samples() != relative.n_samples() {
            return Err(FizzyError::InvalidArgument(format!(
                "{} labels for {} samples",
                labels.n_samples(),
                relative.n_samples()
            )));
        }

        let members: Vec<Vec<usize>> = (0..labels.n_classes())
            .map(|code| labels.members(code))
            .collect();

        let mut features = Vec::with_capacity(indices.len());
        for &idx in indices {
            let feature = relative.features().get(idx).ok_or_else(|| {
                FizzyError::InvalidArgument(format!("Feature index {} out of bounds", idx))
            })?;
            let classes = labels
                .classes()
                .iter()
                .zip(&members)
                .map(|(class, rows)| {
                    let values: Vec<f64> = rows.iter().map(|&i| relative.get(i, idx)).collect();
                    let (mean, std) = mean_std(&values);
                    ClassSummary {
                        class: class.clone(),
                        mean,
                        std,
                    }
                })
                .collect();
            features.push(FeatureStats {
                feature: feature.label.clone(),
                feature_id: feature.id.clone(),
                index: idx,
                classes,
            });
        }

        Ok(Self {
            classes: labels.classes().to_vec(),
            features,
        })
    }

    /// Number of report rows.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Column names of the tabular form.
    pub fn header(&self) -> Vec<String> {
        let mut header = vec!["Features".to_string(), "Feature IDs".to_string()];
        for class in &self.classes {
            header.push(format!("{} (mean)", class));
            header.push(format!("{} (std)", class));
        }
        header
    }

    /// Render as tab-separated text.
    ///
    /// Fields containing tabs, newlines or quotes are quoted.
    pub fn to_tsv_string(&self) -> Result<String> {
        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(self.header())?;
        for row in &self.features {
            let mut record = vec![row.feature.clone(), row.feature_id.clone()];
            for summary in &row.classes {
                record.push(summary.mean.to_string());
                record.push(summary.std.to_string());
            }
            writer.write_record(&record)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| FizzyError::Io(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| FizzyError::InvalidArgument(e.to_string()))
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Render in the requested format.
    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Tsv => self.to_tsv_string(),
            ReportFormat::Json => self.to_json_string(),
            ReportFormat::Yaml => self.to_yaml_string(),
        }
    }

    /// Write the tab-separated report to a file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_tsv_string()?).map_err(FizzyError::io_at(path))?;
        Ok(())
    }
}

/// Mean and population standard deviation.
fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

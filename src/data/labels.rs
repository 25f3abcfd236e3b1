//! Class label resolution.
//!
//! Every matrix sample gets a label, either from its own column metadata or
//! from a mapping file, and labels are coded `0..n_classes` in first-seen
//! order.

use super::mapping::LabelColumn;
use crate::error::{FizzyError, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Where sample labels come from.
#[derive(Debug, Clone, Copy)]
pub enum LabelSource<'a> {
    /// A field of each sample's column metadata.
    Inline {
        metadata: &'a [Option<Value>],
        field: &'a str,
    },
    /// A resolved mapping file column.
    Mapping(&'a LabelColumn),
}

/// Per-sample labels and their integer class codes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassLabels {
    /// Raw label per sample.
    labels: Vec<String>,
    /// Class code per sample.
    codes: Vec<usize>,
    /// Label of each class code.
    classes: Vec<String>,
}

impl ClassLabels {
    /// Code labels in first-seen order.
    pub fn from_labels(labels: Vec<String>) -> Self {
        let mut lookup: HashMap<String, usize> = HashMap::new();
        let mut classes: Vec<String> = Vec::new();
        let mut codes = Vec::with_capacity(labels.len());

        for label in &labels {
            let code = *lookup.entry(label.clone()).or_insert_with(|| {
                classes.push(label.clone());
                classes.len() - 1
            });
            codes.push(code);
        }

        Self {
            labels,
            codes,
            classes,
        }
    }

    /// Raw label per sample.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Class code per sample.
    pub fn codes(&self) -> &[usize] {
        &self.codes
    }

    /// Class labels indexed by code.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn n_samples(&self) -> usize {
        self.codes.len()
    }

    /// Code assigned to a label.
    pub fn code_of(&self, label: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == label)
    }

    /// Sample indices belonging to a class.
    pub fn members(&self, code: usize) -> Vec<usize> {
        self.codes
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == code)
            .map(|(i, _)| i)
            .collect()
    }

    /// Number of samples in each class, indexed by code.
    pub fn class_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_classes()];
        for &code in &self.codes {
            sizes[code] += 1;
        }
        sizes
    }
}

/// Resolve and code the label of every sample, in sample order.
pub fn resolve_labels(sample_ids: &[String], source: LabelSource<'_>) -> Result<ClassLabels> {
    let labels = match source {
        LabelSource::Inline { metadata, field } => {
            if metadata.len() != sample_ids.len() {
                return Err(FizzyError::InvalidArgument(format!(
                    "{} samples but {} metadata entries",
                    sample_ids.len(),
                    metadata.len()
                )));
            }
            sample_ids
                .iter()
                .zip(metadata)
                .map(|(sample, meta)| inline_label(sample, meta.as_ref(), field))
                .collect::<Result<Vec<_>>>()?
        }
        LabelSource::Mapping(column) => sample_ids
            .iter()
            .map(|sample| column.label_of(sample).map(String::from))
            .collect::<Result<Vec<_>>>()?,
    };

    let classes = ClassLabels::from_labels(labels);
    log::debug!(
        "Resolved {} samples into {} classes: {:?}",
        classes.n_samples(),
        classes.n_classes(),
        classes.classes()
    );
    Ok(classes)
}

fn inline_label(sample: &str, metadata: Option<&Value>, field: &str) -> Result<String> {
    let value = metadata
        .ok_or_else(|| FizzyError::mismatch(sample, "has no inline metadata and no mapping file was given"))?
        .get(field);
    match value {
        None | Some(Value::Null) => Err(FizzyError::mismatch(
            sample,
            format!("inline metadata has no value for '{}'", field),
        )),
        Some(Value::String(s)) if s.trim().is_empty() => Err(FizzyError::mismatch(
            sample,
            format!("inline metadata has an empty value for '{}'", field),
        )),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(other) => Ok(other.to_string()),
    }
}

//! Delimited-text abundance tables.
//!
//! Expected format:
//! - First row: sample identifiers, optionally preceded by a corner cell
//! - Subsequent rows: feature label followed by one value per sample
//!
//! Feature identifiers are the 0-based row positions of the feature rows.

use super::biom::AbundanceTable;
use super::feature_matrix::{Feature, FeatureMatrix};
use crate::error::{FizzyError, Result};
use csv::{ReaderBuilder, Trim};
use nalgebra::DMatrix;
use std::io::Read;
use std::path::Path;

/// Load a delimited abundance table from a file.
pub fn read_delimited<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<AbundanceTable> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(FizzyError::io_at(path))?;
    read_delimited_from(file, delimiter, &path.display().to_string())
}

/// Load a delimited abundance table from any reader. `name` identifies the
/// source in error messages.
pub fn read_delimited_from<R: Read>(reader: R, delimiter: u8, name: &str) -> Result<AbundanceTable> {
    let mut records = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader)
        .into_records();

    let header: Vec<String> = records
        .next()
        .ok_or_else(|| FizzyError::schema(name, "file is empty"))?
        .map_err(|e| FizzyError::malformed(name, e.to_string()))?
        .iter()
        .map(String::from)
        .collect();

    let mut labels: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<f64>> = Vec::new();
    let mut width: Option<usize> = None;

    for record in records {
        let record = record.map_err(|e| FizzyError::malformed(name, e.to_string()))?;
        let line = record.position().map_or(0, |p| p.line());
        let mut cells = record.iter();
        let label = cells.next().unwrap_or_default().to_string();

        let values = cells
            .enumerate()
            .map(|(col, cell)| {
                cell.parse::<f64>().map_err(|_| {
                    FizzyError::malformed(
                        name,
                        format!("line {}, column {}: '{}' is not a number", line, col + 2, cell),
                    )
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        match width {
            None => width = Some(values.len()),
            Some(w) if w != values.len() => {
                return Err(FizzyError::schema(
                    name,
                    format!("line {} has {} values, expected {}", line, values.len(), w),
                ));
            }
            Some(_) => {}
        }

        labels.push(label);
        rows.push(values);
    }

    let n_samples = width.ok_or_else(|| FizzyError::schema(name, "no feature rows after the sample header"))?;
    if n_samples == 0 {
        return Err(FizzyError::schema(name, "feature rows carry no sample values"));
    }

    let sample_ids = if header.len() == n_samples {
        header
    } else if header.len() == n_samples + 1 {
        header[1..].to_vec()
    } else {
        return Err(FizzyError::schema(
            name,
            format!(
                "line 1 has {} sample identifiers but feature rows have {} values",
                header.len(),
                n_samples
            ),
        ));
    };

    let values = DMatrix::from_fn(rows.len(), n_samples, |i, j| rows[i][j]);
    let features = labels
        .into_iter()
        .enumerate()
        .map(|(i, label)| Feature::new(i.to_string(), label))
        .collect();

    let matrix = FeatureMatrix::from_feature_major(values, sample_ids, features)?;
    Ok(AbundanceTable::without_metadata(matrix))
}

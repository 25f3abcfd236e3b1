//! Pipeline runner: load, reconcile, transform, select, report.

use super::config::{InputFormat, RunConfig};
use crate::data::{
    read_delimited, resolve_labels, AbundanceTable, BiomDocument, ClassLabels, LabelSource,
    MappingTable,
};
use crate::error::{FizzyError, Result};
use crate::normalize::{discretize, relative_abundance};
use crate::report::{reduced_matrix, StatsReport};
use crate::select::{SelectionEngine, SelectionResult};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Matrix and labels, reconciled and ready for selection.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub table: AbundanceTable,
    pub labels: ClassLabels,
}

/// Everything a successful run produces, held in memory until written.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub selection: SelectionResult,
    pub report: StatsReport,
    pub reduced: Option<BiomDocument>,
}

impl RunOutcome {
    /// Write the report and, if configured, the reduced matrix.
    ///
    /// Every output is rendered and staged in a temporary file next to its
    /// destination before any destination is touched. If any step fails, no
    /// output from this run is left behind.
    pub fn write(&self, config: &RunConfig) -> Result<()> {
        let report = self.report.render(config.output_format)?;
        let reduced = match (&config.reduced_output, &self.reduced) {
            (Some(path), Some(doc)) => Some((path.as_path(), doc.to_json_string()?)),
            _ => None,
        };

        let mut staged = vec![(config.output.as_path(), stage(&config.output, &report)?)];
        if let Some((path, text)) = reduced {
            staged.push((path, stage(path, &text)?));
        }

        let mut committed: Vec<&Path> = Vec::with_capacity(staged.len());
        for (path, file) in staged {
            if let Err(e) = file.persist(path) {
                for done in &committed {
                    if let Err(cleanup) = fs::remove_file(done) {
                        log::warn!("Could not remove {}: {}", done.display(), cleanup);
                    }
                }
                return Err(FizzyError::io_at(path)(e.error));
            }
            log::info!("Wrote {}", path.display());
            committed.push(path);
        }
        Ok(())
    }
}

/// Write `contents` to a temporary file in the directory of `path`.
fn stage(path: &Path, contents: &str) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(FizzyError::io_at(path))?;
    file.write_all(contents.as_bytes())
        .and_then(|()| file.flush())
        .map_err(FizzyError::io_at(path))?;
    Ok(file)
}

/// A configured selection run.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: RunConfig,
}

impl Pipeline {
    /// Create a pipeline, rejecting invalid settings up front.
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Load the abundance table in the configured format.
    pub fn load_table(&self) -> Result<AbundanceTable> {
        let table = match self.config.input_format {
            InputFormat::Biom => AbundanceTable::from_biom(&self.config.input)?,
            InputFormat::Delimited => {
                read_delimited(&self.config.input, self.config.delimiter_byte()?)?
            }
        };
        log::info!(
            "Loaded {} samples x {} features from {}",
            table.matrix.n_samples(),
            table.matrix.n_features(),
            self.config.input.display()
        );
        Ok(table)
    }

    /// Load the matrix and resolve every sample's class.
    pub fn prepare(&self) -> Result<PreparedData> {
        let table = self.load_table()?;
        let sample_ids = table.matrix.sample_ids();

        let labels = match &self.config.mapping {
            Some(path) => {
                let mapping = MappingTable::from_tsv(path, &self.config.sample_id_column)?;
                log::info!(
                    "Loaded mapping for {} samples from {}",
                    mapping.n_samples(),
                    path.display()
                );
                let column = mapping.label_column(&self.config.label_field)?;
                resolve_labels(sample_ids, LabelSource::Mapping(&column))?
            }
            None => resolve_labels(
                sample_ids,
                LabelSource::Inline {
                    metadata: &table.sample_metadata,
                    field: &self.config.label_field,
                },
            )?,
        };

        log::info!(
            "Found {} classes in '{}': {}",
            labels.n_classes(),
            self.config.label_field,
            labels.classes().join(", ")
        );
        Ok(PreparedData { table, labels })
    }

    /// Run selection on prepared data without writing anything.
    pub fn run_prepared<E>(&self, prepared: &PreparedData, engine: &E) -> Result<RunOutcome>
    where
        E: SelectionEngine + ?Sized,
    {
        let counts = &prepared.table.matrix;
        let selection_config = &self.config.selection;

        if selection_config.n_select > counts.n_features() {
            return Err(FizzyError::InvalidArgument(format!(
                "Cannot select {} features from a matrix with {} features",
                selection_config.n_select,
                counts.n_features()
            )));
        }

        let relative = relative_abundance(counts)?;
        let discrete = discretize(counts, self.config.n_bins)?;

        let ranked = engine.rank(&discrete, prepared.labels.codes(), selection_config)?;
        let selection = SelectionResult::new(ranked, counts.n_features(), selection_config.n_select)?;
        log::info!(
            "Engine selected {} features with {}",
            selection.len(),
            selection_config.method
        );

        let report = StatsReport::from_relative(selection.indices(), &relative, &prepared.labels)?;
        let reduced = match self.config.reduced_output {
            Some(_) => Some(reduced_matrix(
                selection.indices(),
                &relative,
                &prepared.table.sample_metadata,
            )?),
            None => None,
        };

        Ok(RunOutcome {
            selection,
            report,
            reduced,
        })
    }

    /// Load, select and build outputs, without writing anything.
    pub fn run<E>(&self, engine: &E) -> Result<RunOutcome>
    where
        E: SelectionEngine + ?Sized,
    {
        let prepared = self.prepare()?;
        self.run_prepared(&prepared, engine)
    }

    /// Run and write all outputs.
    pub fn execute<E>(&self, engine: &E) -> Result<RunOutcome>
    where
        E: SelectionEngine + ?Sized,
    {
        let outcome = self.run(engine)?;
        outcome.write(&self.config)?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::DiscreteMatrix;
    use crate::select::SelectionConfig;
    use std::cell::Cell;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    /// Returns a fixed ranking and counts how often it was asked.
    struct FixedEngine {
        ranking: Vec<usize>,
        calls: Cell<usize>,
    }

    impl FixedEngine {
        fn new(ranking: Vec<usize>) -> Self {
            Self {
                ranking,
                calls: Cell::new(0),
            }
        }
    }

    impl SelectionEngine for FixedEngine {
        fn rank(
            &self,
            _data: &DiscreteMatrix,
            _classes: &[usize],
            _config: &SelectionConfig,
        ) -> Result<Vec<usize>> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.ranking.clone())
        }
    }

    fn write_temp(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", text).unwrap();
        file.flush().unwrap();
        file
    }

    fn inline_biom() -> NamedTempFile {
        write_temp(
            r#"{
                "matrix_type": "sparse",
                "shape": [3, 3],
                "data": [[0, 0, 4], [1, 0, 4], [0, 1, 1], [2, 1, 3], [1, 2, 2], [2, 2, 2]],
                "rows": [{"id": "F1"}, {"id": "F2"}, {"id": "F3"}],
                "columns": [
                    {"id": "S1", "metadata": {"Site": "gut"}},
                    {"id": "S2", "metadata": {"Site": "skin"}},
                    {"id": "S3", "metadata": {"Site": "gut"}}
                ]
            }"#,
        )
    }

    #[test]
    fn test_inline_labels_without_mapping() {
        let input = inline_biom();
        let dir = TempDir::new().unwrap();
        let mut config = RunConfig::new(input.path(), "Site", dir.path().join("report.tsv"));
        config.selection.n_select = 2;

        let pipeline = Pipeline::new(config).unwrap();
        let prepared = pipeline.prepare().unwrap();
        assert_eq!(prepared.labels.classes(), &["gut", "skin"]);
        assert_eq!(prepared.labels.codes(), &[0, 1, 0]);

        let engine = FixedEngine::new(vec![2]);
        let outcome = pipeline.run_prepared(&prepared, &engine).unwrap();
        assert_eq!(engine.calls.get(), 1);
        assert_eq!(outcome.selection.indices(), &[2]);
        assert_eq!(outcome.report.len(), 1);
        assert!(outcome.reduced.is_none());
    }

    #[test]
    fn test_too_many_requested() {
        let input = inline_biom();
        let mut config = RunConfig::new(input.path(), "Site", "unused.tsv");
        config.selection.n_select = 4;

        let pipeline = Pipeline::new(config).unwrap();
        let engine = FixedEngine::new(vec![0]);
        let err = pipeline.run(&engine).unwrap_err();
        assert!(matches!(err, FizzyError::InvalidArgument(_)));
        assert_eq!(engine.calls.get(), 0);
    }

    #[test]
    fn test_bad_engine_output_rejected() {
        let input = inline_biom();
        let mut config = RunConfig::new(input.path(), "Site", "unused.tsv");
        config.selection.n_select = 2;

        let pipeline = Pipeline::new(config).unwrap();
        let err = pipeline.run(&FixedEngine::new(vec![1, 1])).unwrap_err();
        assert!(matches!(err, FizzyError::Engine(_)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = RunConfig::new("t.biom", "Site", "o.tsv");
        config.selection.bootstraps = 0;
        assert!(matches!(Pipeline::new(config), Err(FizzyError::InvalidArgument(_))));
    }

    #[test]
    fn test_missing_label_field_in_mapping() {
        let input = inline_biom();
        let mapping = write_temp("#SampleID\tSite\nS1\tgut\nS2\tskin\nS3\tgut\n");
        let mut config = RunConfig::new(input.path(), "Diet", "unused.tsv");
        config.mapping = Some(mapping.path().to_path_buf());

        let err = Pipeline::new(config).unwrap().prepare().unwrap_err();
        assert!(matches!(err, FizzyError::SchemaViolation { .. }));
        assert!(err.to_string().contains("Diet"));
    }
}

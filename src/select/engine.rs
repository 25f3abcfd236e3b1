//! The selection engine boundary.
//!
//! Ranking itself happens outside this crate. The pipeline only needs
//! something that takes the discretized matrix and class codes and returns an
//! ordered list of feature indices, so the engine is a trait and the binary
//! plugs in [`ExternalEngine`].

use super::method::SelectionConfig;
use crate::error::{FizzyError, Result};
use crate::normalize::DiscreteMatrix;
use serde::Serialize;
use std::collections::HashSet;
use csv::{Terminator, WriterBuilder};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

/// A feature-ranking capability.
///
/// `rank` blocks until the engine is done and either returns its complete
/// ranking or fails; there are no partial results.
pub trait SelectionEngine {
    /// Rank features of `data` against `classes` (one code per sample).
    ///
    /// Returns 0-based feature indices, best first.
    fn rank(
        &self,
        data: &DiscreteMatrix,
        classes: &[usize],
        config: &SelectionConfig,
    ) -> Result<Vec<usize>>;
}

/// Validated engine output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionResult {
    indices: Vec<usize>,
}

impl SelectionResult {
    /// Check engine output against the matrix it ranked.
    ///
    /// Indices must be distinct, inside `0..n_features`, and there must be
    /// between 1 and `max_len` of them.
    pub fn new(indices: Vec<usize>, n_features: usize, max_len: usize) -> Result<Self> {
        if indices.is_empty() {
            return Err(FizzyError::Engine("engine selected no features".to_string()));
        }
        if indices.len() > max_len {
            return Err(FizzyError::Engine(format!(
                "engine returned {} features, at most {} were requested",
                indices.len(),
                max_len
            )));
        }
        let mut seen = HashSet::with_capacity(indices.len());
        for &idx in &indices {
            if idx >= n_features {
                return Err(FizzyError::Engine(format!(
                    "feature index {} out of range for {} features",
                    idx, n_features
                )));
            }
            if !seen.insert(idx) {
                return Err(FizzyError::Engine(format!(
                    "feature index {} selected more than once",
                    idx
                )));
            }
        }
        Ok(Self { indices })
    }

    /// Selected feature indices, best first.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Delegates ranking to an external program.
///
/// The program receives the configuration as flags
/// (`--method --select --bootstraps --alpha --workers`) and the data on stdin
/// as TSV: a `class` column followed by one column per feature, one line per
/// sample. It must print the selected feature indices to stdout, separated by
/// whitespace or commas.
#[derive(Debug, Clone)]
pub struct ExternalEngine {
    program: PathBuf,
    args: Vec<String>,
}

impl ExternalEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Arguments passed before the configuration flags.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn config_args(config: &SelectionConfig) -> Vec<String> {
        vec![
            "--method".to_string(),
            config.method.name().to_string(),
            "--select".to_string(),
            config.n_select.to_string(),
            "--bootstraps".to_string(),
            config.bootstraps.to_string(),
            "--alpha".to_string(),
            config.alpha.to_string(),
            "--workers".to_string(),
            config.workers.to_string(),
        ]
    }

    /// Serialize the engine input.
    pub fn encode_input(data: &DiscreteMatrix, classes: &[usize]) -> Result<String> {
        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        let mut header = vec!["class".to_string()];
        header.extend((0..data.n_features()).map(|j| j.to_string()));
        writer.write_record(&header)?;

        for (i, class) in classes.iter().enumerate() {
            let mut record = vec![class.to_string()];
            record.extend(data.row(i).iter().map(u64::to_string));
            writer.write_record(&record)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| FizzyError::Io(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| FizzyError::Engine(e.to_string()))
    }

    /// Parse the indices printed by the engine.
    pub fn parse_output(stdout: &str) -> Result<Vec<usize>> {
        stdout
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|tok| !tok.is_empty())
            .map(|tok| {
                tok.parse::<usize>().map_err(|_| {
                    FizzyError::Engine(format!("unexpected token '{}' in engine output", tok))
                })
            })
            .collect()
    }
}

impl SelectionEngine for ExternalEngine {
    fn rank(
        &self,
        data: &DiscreteMatrix,
        classes: &[usize],
        config: &SelectionConfig,
    ) -> Result<Vec<usize>> {
        if classes.len() != data.n_samples() {
            return Err(FizzyError::InvalidArgument(format!(
                "{} class codes for {} samples",
                classes.len(),
                data.n_samples()
            )));
        }

        let program = self.program.display().to_string();
        log::info!(
            "Running selection engine '{}' ({}, {} features, {} bootstraps)",
            program,
            config.method,
            config.n_select,
            config.bootstraps
        );

        let input = Self::encode_input(data, classes)?;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .args(Self::config_args(config))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FizzyError::Engine(format!("failed to start '{}': {}", program, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| FizzyError::Engine(format!("no stdin pipe to '{}'", program)))?;

        // Feed stdin on its own thread so stdout and stderr keep draining.
        let (output, written) = thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(input.as_bytes()));
            let output = child.wait_with_output();
            (output, writer.join())
        });

        let output = output
            .map_err(|e| FizzyError::Engine(format!("'{}' did not finish: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FizzyError::Engine(format!(
                "'{}' exited with {}: {}",
                program,
                output.status,
                stderr.trim()
            )));
        }

        match written {
            Ok(Ok(())) => {}
            // An engine may stop reading before the end of its input.
            Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => {
                return Err(FizzyError::Engine(format!(
                    "failed to send data to '{}': {}",
                    program, e
                )))
            }
            Err(_) => {
                return Err(FizzyError::Engine(format!(
                    "input writer for '{}' panicked",
                    program
                )))
            }
        }

        Self::parse_output(&String::from_utf8_lossy(&output.stdout))
    }
}

//! Selection methods and engine configuration.

use crate::error::{FizzyError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Information-theoretic ranking methods understood by the selection engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SelectionMethod {
    /// Conditional infomax feature extraction.
    Cife,
    /// Conditional mutual information maximization.
    Cmim,
    /// Conditional mutual information.
    CondMi,
    /// Conditional redundancy.
    Condred,
    /// Double input symmetrical relevance.
    Disr,
    /// Interaction capping.
    Icap,
    /// Joint mutual information.
    Jmi,
    /// Mutual information maximization.
    Mim,
    /// Mutual information feature selection.
    Mifs,
    /// Minimum redundancy maximum relevance.
    Mrmr,
}

impl SelectionMethod {
    /// Every supported method.
    pub const ALL: [SelectionMethod; 10] = [
        Self::Cife,
        Self::Cmim,
        Self::CondMi,
        Self::Condred,
        Self::Disr,
        Self::Icap,
        Self::Jmi,
        Self::Mim,
        Self::Mifs,
        Self::Mrmr,
    ];

    /// Canonical method name, as passed to the engine.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cife => "CIFE",
            Self::Cmim => "CMIM",
            Self::CondMi => "CondMI",
            Self::Condred => "Condred",
            Self::Disr => "DISR",
            Self::Icap => "ICAP",
            Self::Jmi => "JMI",
            Self::Mim => "MIM",
            Self::Mifs => "MIFS",
            Self::Mrmr => "mRMR",
        }
    }

    fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|m| m.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for SelectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SelectionMethod {
    type Err = FizzyError;

    /// Parse a method name, ignoring case.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| FizzyError::InvalidSelectionMethod {
                name: s.to_string(),
                valid: Self::valid_names(),
            })
    }
}

impl TryFrom<String> for SelectionMethod {
    type Error = FizzyError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SelectionMethod> for String {
    fn from(method: SelectionMethod) -> Self {
        method.name().to_string()
    }
}

fn default_n_select() -> usize {
    15
}

fn default_bootstraps() -> usize {
    100
}

fn default_alpha() -> f64 {
    0.01
}

fn default_workers() -> usize {
    1
}

/// Parameters handed to the selection engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Ranking method.
    pub method: SelectionMethod,
    /// Number of features to select.
    #[serde(default = "default_n_select")]
    pub n_select: usize,
    /// Bootstrap iterations for the significance test.
    #[serde(default = "default_bootstraps")]
    pub bootstraps: usize,
    /// Significance threshold.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Worker-count hint for the engine.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            method: SelectionMethod::Mim,
            n_select: default_n_select(),
            bootstraps: default_bootstraps(),
            alpha: default_alpha(),
            workers: default_workers(),
        }
    }
}

impl SelectionConfig {
    /// Reject non-positive counts and thresholds.
    pub fn validate(&self) -> Result<()> {
        if self.n_select == 0 {
            return Err(FizzyError::InvalidArgument(
                "Number of features to select must be positive".to_string(),
            ));
        }
        if self.bootstraps == 0 {
            return Err(FizzyError::InvalidArgument(
                "Number of bootstraps must be positive".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(FizzyError::InvalidArgument(
                "Number of workers must be positive".to_string(),
            ));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(FizzyError::InvalidArgument(format!(
                "Significance threshold must be in (0, 1), got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

//! Error types for the preprocessing and inference pipeline.
//!
//! Every failure carries enough context to identify the offending stage and
//! column. Validation failures ([`ErrorKind::Schema`], [`ErrorKind::Range`])
//! are raised before any stage runs and are the caller's to fix; the rest
//! point at an integrity problem in the fitted parameters or the classifier.

use std::fmt;

use polars::prelude::PolarsError;
use serde::Serialize;

use crate::model::ScoringError;
use crate::pipeline::schema::FeatureDomain;

/// Pipeline stage in which an error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validation,
    OutlierClamp,
    CorrelationFilter,
    FeatureScaler,
    Scoring,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validation => "validation",
            Stage::OutlierClamp => "outlier clamp",
            Stage::CorrelationFilter => "correlation filter",
            Stage::FeatureScaler => "feature scaler",
            Stage::Scoring => "scoring",
        };
        f.write_str(name)
    }
}

/// Coarse classification of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Schema,
    Range,
    DegenerateData,
    UninitializedState,
    UpstreamScoring,
    Configuration,
    Internal,
}

/// A single value outside its documented domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeViolation {
    pub column: String,
    /// Zero-based row index
    pub row: usize,
    /// `None` when the cell was empty
    pub value: Option<f64>,
    pub domain: FeatureDomain,
}

impl fmt::Display for RangeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(v) => write!(
                f,
                "{} row {}: {} is outside {}",
                self.column, self.row, v, self.domain
            ),
            None => write!(
                f,
                "{} row {}: missing value (expected {})",
                self.column, self.row, self.domain
            ),
        }
    }
}

fn format_violations(violations: &[RangeViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors produced by the pipeline stages and the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("missing required column(s): {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("duplicate column(s) after trimming names: {}", .columns.join(", "))]
    DuplicateColumns { columns: Vec<String> },

    #[error("column '{column}' must be numeric, found {dtype}")]
    NonNumericColumn { column: String, dtype: String },

    #[error(
        "feature set mismatch: parameters were fitted on [{}], request uses [{}]",
        .expected.join(", "),
        .found.join(", ")
    )]
    FeatureSetMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("{} value(s) out of range: {}", .violations.len(), format_violations(.violations))]
    OutOfRange { violations: Vec<RangeViolation> },

    #[error("{stage}: column '{column}' not found")]
    StageColumnMissing { stage: Stage, column: String },

    #[error("{stage}: column '{column}' has no numeric values")]
    EmptyColumn { stage: Stage, column: String },

    #[error("{stage}: column '{column}' has a missing or non-finite value at row {row}")]
    InvalidValue {
        stage: Stage,
        column: String,
        row: usize,
    },

    #[error("{stage}: column '{column}' has zero variance and cannot be standardized")]
    DegenerateData { stage: Stage, column: String },

    #[error("{stage}: input table has no rows")]
    EmptyTable { stage: Stage },

    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error("pipeline is not initialized: {0}")]
    Uninitialized(String),

    #[error("scoring: {0}")]
    UpstreamScoring(#[from] ScoringError),

    #[error("{stage}: {source}")]
    Polars {
        stage: Stage,
        #[source]
        source: PolarsError,
    },
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::MissingColumns { .. }
            | PipelineError::DuplicateColumns { .. }
            | PipelineError::NonNumericColumn { .. }
            | PipelineError::FeatureSetMismatch { .. }
            | PipelineError::StageColumnMissing { .. }
            | PipelineError::EmptyColumn { .. }
            | PipelineError::EmptyTable { .. } => ErrorKind::Schema,
            PipelineError::OutOfRange { .. } | PipelineError::InvalidValue { .. } => {
                ErrorKind::Range
            }
            PipelineError::DegenerateData { .. } => ErrorKind::DegenerateData,
            PipelineError::InvalidConfig(_) => ErrorKind::Configuration,
            PipelineError::Uninitialized(_) => ErrorKind::UninitializedState,
            PipelineError::UpstreamScoring(_) => ErrorKind::UpstreamScoring,
            PipelineError::Polars { .. } => ErrorKind::Internal,
        }
    }

    /// Stage that raised the error, if it came from inside the pipeline.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::MissingColumns { .. }
            | PipelineError::DuplicateColumns { .. }
            | PipelineError::NonNumericColumn { .. }
            | PipelineError::OutOfRange { .. } => Some(Stage::Validation),
            PipelineError::StageColumnMissing { stage, .. }
            | PipelineError::EmptyColumn { stage, .. }
            | PipelineError::InvalidValue { stage, .. }
            | PipelineError::DegenerateData { stage, .. }
            | PipelineError::EmptyTable { stage }
            | PipelineError::Polars { stage, .. } => Some(*stage),
            PipelineError::UpstreamScoring(_) => Some(Stage::Scoring),
            PipelineError::FeatureSetMismatch { .. }
            | PipelineError::InvalidConfig(_)
            | PipelineError::Uninitialized(_) => None,
        }
    }

    /// True when the request itself was malformed and the caller can fix it.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingColumns { .. }
                | PipelineError::DuplicateColumns { .. }
                | PipelineError::NonNumericColumn { .. }
                | PipelineError::OutOfRange { .. }
                | PipelineError::EmptyTable {
                    stage: Stage::Validation
                }
        )
    }
}

/// Attach a pipeline stage to polars results.
pub(crate) trait InStage<T> {
    fn in_stage(self, stage: Stage) -> Result<T, PipelineError>;
}

impl<T> InStage<T> for Result<T, PolarsError> {
    fn in_stage(self, stage: Stage) -> Result<T, PipelineError> {
        self.map_err(|source| PipelineError::Polars { stage, source })
    }
}

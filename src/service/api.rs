//! Request and response payloads of the prediction API

use serde::{Deserialize, Serialize};

use crate::pipeline::error::{ErrorKind, PipelineError, RangeViolation, Stage};
use crate::pipeline::prediction::Prediction;

use super::ServiceError;

/// Response to a single-record prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Cultivar name
    pub prediction: String,
    /// Probability of the predicted cultivar, e.g. `"87.35%"`
    pub confidence: String,
    /// Raw positive-class probability
    pub probability: f64,
    pub class_id: u8,
}

impl From<&Prediction> for PredictionResponse {
    fn from(p: &Prediction) -> Self {
        Self {
            prediction: p.label.clone(),
            confidence: p.confidence_percent(),
            probability: p.probability,
            class_id: p.class_id,
        }
    }
}

/// Error payload. Client errors map to 400, everything else to 500.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_columns: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<RangeViolation>,
}

impl ErrorResponse {
    pub fn is_client_error(&self) -> bool {
        self.status == 400
    }
}

impl From<&PipelineError> for ErrorResponse {
    fn from(err: &PipelineError) -> Self {
        let (missing_columns, violations) = match err {
            PipelineError::MissingColumns { columns } => (columns.clone(), Vec::new()),
            PipelineError::OutOfRange { violations } => (Vec::new(), violations.clone()),
            _ => (Vec::new(), Vec::new()),
        };
        Self {
            status: if err.is_client_error() { 400 } else { 500 },
            kind: err.kind(),
            stage: err.stage(),
            message: err.to_string(),
            missing_columns,
            violations,
        }
    }
}

impl From<&ServiceError> for ErrorResponse {
    fn from(err: &ServiceError) -> Self {
        match err {
            ServiceError::Pipeline(e) => Self::from(e),
            ServiceError::Malformed(_) => Self {
                status: 400,
                kind: ErrorKind::Schema,
                stage: Some(Stage::Validation),
                message: err.to_string(),
                missing_columns: Vec::new(),
                violations: Vec::new(),
            },
            ServiceError::Bundle(_) => Self {
                status: 500,
                kind: ErrorKind::UninitializedState,
                stage: None,
                message: err.to_string(),
                missing_columns: Vec::new(),
                violations: Vec::new(),
            },
        }
    }
}

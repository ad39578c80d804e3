//! Serving layer - a context built once from a parameter bundle
//!
//! [`ServiceContext`] is cheap to clone and `Send + Sync`; every request runs
//! the frozen pipeline and the bundled classifier without touching any
//! shared mutable state.

pub mod api;

use std::path::Path;
use std::sync::Arc;

use polars::prelude::*;
use serde_json::Value;

use crate::model::ScoringAdapter;
use crate::pipeline::bundle::{BundleError, ParameterBundle};
use crate::pipeline::error::{InStage, PipelineError, Stage};
use crate::pipeline::orchestrator::Pipeline;
use crate::pipeline::prediction::Prediction;
use crate::pipeline::schema::{
    duplicate_trimmed_names, feature_columns, normalize_column_names, records_to_frame, SeedRecord,
};

pub use api::{ErrorResponse, PredictionResponse};

/// Output column holding the predicted cultivar
pub const PREDICTION_COLUMN: &str = "Prediction";
/// Output column holding the confidence percentage
pub const CONFIDENCE_COLUMN: &str = "Confidence";

/// Errors surfaced to callers of the serving layer.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("malformed request: {0}")]
    Malformed(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Bundle(#[from] BundleError),
}

impl ServiceError {
    pub fn is_client_error(&self) -> bool {
        match self {
            ServiceError::Malformed(_) => true,
            ServiceError::Pipeline(e) => e.is_client_error(),
            ServiceError::Bundle(_) => false,
        }
    }
}

/// Result of a batch request.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    /// Input table plus the prediction columns
    pub table: DataFrame,
    pub predictions: Vec<Prediction>,
}

/// Immutable serving state shared by every request.
#[derive(Debug, Clone)]
pub struct ServiceContext {
    bundle: Arc<ParameterBundle>,
    pipeline: Arc<Pipeline>,
}

impl ServiceContext {
    /// Build the context from a bundle fitted on the canonical seed features.
    pub fn from_bundle(bundle: ParameterBundle) -> Result<Self, BundleError> {
        bundle.validate()?;
        bundle.ensure_features(&feature_columns())?;
        let pipeline = bundle.pipeline();
        Ok(Self {
            bundle: Arc::new(bundle),
            pipeline: Arc::new(pipeline),
        })
    }

    /// Load the bundle at `path`. Any failure here is fatal for serving.
    pub fn load(path: &Path) -> Result<Self, BundleError> {
        Self::from_bundle(ParameterBundle::load(path)?)
    }

    pub fn bundle(&self) -> &ParameterBundle {
        &self.bundle
    }

    pub fn classifier(&self) -> &dyn ScoringAdapter {
        self.bundle.classifier.adapter()
    }

    /// Score every row of a feature table.
    pub fn predict(&self, table: &DataFrame) -> Result<Vec<Prediction>, PipelineError> {
        let result = self
            .pipeline
            .apply(table, self.classifier(), &self.bundle.labels);
        match &result {
            Ok(predictions) => tracing::debug!(rows = predictions.len(), "request scored"),
            Err(e) => tracing::warn!(kind = ?e.kind(), stage = ?e.stage(), "request rejected: {e}"),
        }
        result
    }

    /// Single-record prediction.
    pub fn predict_one(&self, record: &SeedRecord) -> Result<PredictionResponse, PipelineError> {
        let table = records_to_frame(std::slice::from_ref(record)).in_stage(Stage::Validation)?;
        let prediction = self.single(&table)?;
        Ok(PredictionResponse::from(&prediction))
    }

    /// Single-record prediction from a JSON object keyed by feature name.
    ///
    /// Missing features are reported together as a schema error; extra keys
    /// are ignored.
    pub fn predict_json(&self, json: &str) -> Result<PredictionResponse, ServiceError> {
        let table = json_record_to_frame(json)?;
        let prediction = self.single(&table)?;
        Ok(PredictionResponse::from(&prediction))
    }

    /// Predictions for a list of records, in input order.
    pub fn predict_records(
        &self,
        records: &[SeedRecord],
    ) -> Result<Vec<PredictionResponse>, PipelineError> {
        let table = records_to_frame(records).in_stage(Stage::Validation)?;
        Ok(self
            .predict(&table)?
            .iter()
            .map(PredictionResponse::from)
            .collect())
    }

    /// Batch prediction: the input table with `Prediction` and `Confidence`
    /// columns appended. Column names are trimmed before matching.
    pub fn predict_table(&self, table: &DataFrame) -> Result<DataFrame, PipelineError> {
        Ok(self.score_table(table)?.table)
    }

    /// Like [`Self::predict_table`], also returning the per-row predictions.
    pub fn score_table(&self, table: &DataFrame) -> Result<BatchOutput, PipelineError> {
        let mut output = table.clone();
        normalize_column_names(&mut output)?;
        let predictions = self.predict(&output)?;

        let labels: Vec<&str> = predictions.iter().map(|p| p.label.as_str()).collect();
        let confidences: Vec<String> = predictions.iter().map(Prediction::confidence_percent).collect();
        output
            .with_column(Column::new(PREDICTION_COLUMN.into(), labels))
            .in_stage(Stage::Scoring)?;
        output
            .with_column(Column::new(CONFIDENCE_COLUMN.into(), confidences))
            .in_stage(Stage::Scoring)?;

        tracing::info!(rows = output.height(), "batch scored");
        Ok(BatchOutput {
            table: output,
            predictions,
        })
    }

    fn single(&self, table: &DataFrame) -> Result<Prediction, PipelineError> {
        self.predict(table)?
            .into_iter()
            .next()
            .ok_or(PipelineError::EmptyTable {
                stage: Stage::Scoring,
            })
    }
}

/// Parse one JSON object into a single-row table.
fn json_record_to_frame(json: &str) -> Result<DataFrame, ServiceError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| ServiceError::Malformed(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(ServiceError::Malformed(
            "expected a JSON object keyed by feature name".to_string(),
        ));
    };

    let features = feature_columns();
    let mut columns = Vec::with_capacity(fields.len());
    for (key, value) in &fields {
        let name = key.trim();
        let cell = match value {
            Value::Number(n) => n.as_f64(),
            Value::Null => None,
            _ if features.iter().any(|f| f == name) => {
                return Err(ServiceError::Malformed(format!(
                    "feature '{name}' must be a number, got {value}"
                )));
            }
            _ => continue,
        };
        columns.push(Column::new(name.into(), [cell]));
    }

    let duplicates = duplicate_trimmed_names(columns.iter().map(|c| c.name().as_str()));
    if !duplicates.is_empty() {
        return Err(PipelineError::DuplicateColumns {
            columns: duplicates,
        }
        .into());
    }

    if columns.is_empty() {
        // Keep the row count at one so validation reports missing columns
        columns.push(Column::new("__empty".into(), [None::<f64>]));
    }
    DataFrame::new(columns).map_err(|e| ServiceError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(df: &DataFrame) -> Vec<String> {
        df.get_column_names().iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_json_record_ignores_extra_keys() {
        let df = json_record_to_frame(r#"{"Area": 1.0, "note": "lab 3"}"#).unwrap();
        assert_eq!(names(&df), vec!["Area"]);
    }

    #[test]
    fn test_json_record_trims_keys() {
        let df = json_record_to_frame(r#"{" Area ": 1.0}"#).unwrap();
        assert_eq!(names(&df), vec!["Area"]);
        assert_eq!(df.height(), 1);
    }

    #[test]
    fn test_json_record_rejects_keys_equal_after_trimming() {
        let err = json_record_to_frame(r#"{"Area": 1.0, " Area ": 2.0}"#).unwrap_err();
        assert!(matches!(
            &err,
            ServiceError::Pipeline(PipelineError::DuplicateColumns { columns }) if columns == &["Area"]
        ));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_json_record_rejects_text_feature() {
        let err = json_record_to_frame(r#"{"Area": "big"}"#).unwrap_err();
        assert!(matches!(err, ServiceError::Malformed(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_json_record_rejects_arrays() {
        assert!(json_record_to_frame("[1, 2]").is_err());
        assert!(json_record_to_frame("{").is_err());
    }
}

//! Pipeline orchestration: outlier clamp -> correlation filter -> scaler -> scoring
//!
//! Training mode ([`Pipeline::fit_transform`]) fits every stage on the training
//! table. Serving mode ([`Pipeline::apply`]) only runs the frozen `transform`
//! of each stage, in the same order, and never refits anything.

use faer::Mat;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::model::ScoringAdapter;
use crate::pipeline::correlation::{
    CorrelationFilter, FittedCorrelationFilter, DEFAULT_CORRELATION_THRESHOLD,
};
use crate::pipeline::error::{InStage, PipelineError, Stage};
use crate::pipeline::outlier::{FittedOutlierClamp, OutlierClamp};
use crate::pipeline::prediction::{ClassLabels, Prediction};
use crate::pipeline::scaler::{is_degenerate_scale, FeatureScaler, FittedFeatureScaler};
use crate::pipeline::schema::{
    dense_values, feature_columns, validate_table, DEFAULT_OUTLIER_COLUMNS,
};

/// Hyperparameters of the preprocessing chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Required input columns, in order
    pub feature_columns: Vec<String>,
    /// Columns clipped by the outlier clamp
    pub outlier_columns: Vec<String>,
    pub correlation_threshold: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feature_columns: feature_columns(),
            outlier_columns: DEFAULT_OUTLIER_COLUMNS.iter().map(|s| s.to_string()).collect(),
            correlation_threshold: DEFAULT_CORRELATION_THRESHOLD,
        }
    }
}

impl PipelineConfig {
    pub fn with_feature_columns(mut self, columns: Vec<String>) -> Self {
        self.feature_columns = columns;
        self
    }

    pub fn with_outlier_columns(mut self, columns: Vec<String>) -> Self {
        self.outlier_columns = columns;
        self
    }

    pub fn with_correlation_threshold(mut self, threshold: f64) -> Self {
        self.correlation_threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.feature_columns.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "no feature columns configured".to_string(),
            ));
        }
        if let Some(unknown) = self
            .outlier_columns
            .iter()
            .find(|c| !self.feature_columns.contains(c))
        {
            return Err(PipelineError::InvalidConfig(format!(
                "outlier column '{unknown}' is not a feature column"
            )));
        }
        if !(self.correlation_threshold > 0.0 && self.correlation_threshold <= 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "correlation threshold must be in (0, 1], got {}",
                self.correlation_threshold
            )));
        }
        Ok(())
    }
}

/// The three fitted stages plus the feature list they were fitted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    pub feature_columns: Vec<String>,
    pub outlier: FittedOutlierClamp,
    pub correlation: FittedCorrelationFilter,
    pub scaler: FittedFeatureScaler,
}

impl FittedPreprocessor {
    /// Columns handed to the classifier, in order.
    pub fn output_columns(&self) -> Vec<String> {
        self.scaler.column_names()
    }

    /// Run the frozen stages on a table that already passed validation.
    pub fn transform(&self, table: &DataFrame) -> Result<DataFrame, PipelineError> {
        let features = table
            .select(self.feature_columns.iter().map(String::as_str))
            .in_stage(Stage::Validation)?;
        let clamped = self.outlier.transform(&features)?;
        let reduced = self.correlation.transform(&clamped)?;
        self.scaler.transform(&reduced)
    }

    /// Check that the three parameter sets describe one consistent fit.
    pub fn check_consistency(&self) -> Result<(), String> {
        for b in self.outlier.bounds() {
            if !self.feature_columns.contains(&b.column) {
                return Err(format!("outlier bounds for unknown column '{}'", b.column));
            }
            if ![b.lower, b.upper, b.median].iter().all(|v| v.is_finite()) {
                return Err(format!("non-finite outlier bounds for '{}'", b.column));
            }
        }

        for dropped in self.correlation.drop_list() {
            if !self.feature_columns.contains(dropped) {
                return Err(format!("drop list names unknown column '{dropped}'"));
            }
        }

        let expected: Vec<String> = self
            .feature_columns
            .iter()
            .filter(|c| !self.correlation.drop_list().contains(c))
            .cloned()
            .collect();
        let scaled = self.output_columns();
        if scaled != expected {
            return Err(format!(
                "scaler columns [{}] do not match surviving features [{}]",
                scaled.join(", "),
                expected.join(", ")
            ));
        }

        if let Some(p) = self
            .scaler
            .parameters()
            .iter()
            .find(|p| is_degenerate_scale(p.mean, p.std))
        {
            return Err(format!("invalid scale parameters for '{}'", p.column));
        }
        Ok(())
    }
}

/// Per-column count of values replaced by the outlier clamp during training.
pub type ClampCounts = Vec<(String, usize)>;

/// Preprocessing pipeline with an optional frozen parameter set.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    fitted: Option<FittedPreprocessor>,
    clamp_counts: ClampCounts,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            fitted: None,
            clamp_counts: Vec::new(),
        }
    }

    /// Serving-mode pipeline around parameters loaded from a bundle.
    pub fn from_fitted(config: PipelineConfig, fitted: FittedPreprocessor) -> Self {
        Self {
            config,
            fitted: Some(fitted),
            clamp_counts: Vec::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    pub fn fitted(&self) -> Option<&FittedPreprocessor> {
        self.fitted.as_ref()
    }

    pub fn into_fitted(self) -> Option<FittedPreprocessor> {
        self.fitted
    }

    /// Values replaced per clamped column by the last `fit_transform`.
    pub fn clamp_counts(&self) -> &[(String, usize)] {
        &self.clamp_counts
    }

    /// Training mode: fit each stage on the output of the previous one.
    ///
    /// Returns the standardized training features. Refitting replaces any
    /// previously held parameters as a whole.
    pub fn fit_transform(&mut self, table: &DataFrame) -> Result<DataFrame, PipelineError> {
        self.config.validate()?;
        validate_table(table, &self.config.feature_columns)?;

        let features = table
            .select(self.config.feature_columns.iter().map(String::as_str))
            .in_stage(Stage::Validation)?;

        let outlier = OutlierClamp::new(self.config.outlier_columns.iter().cloned()).fit(&features)?;
        let (clamped, clamp_counts) = outlier.transform_counted(&features)?;

        let correlation = CorrelationFilter::new(self.config.correlation_threshold).fit(&clamped)?;
        let reduced = correlation.transform(&clamped)?;

        let scaler = FeatureScaler::new().fit(&reduced)?;
        let scaled = scaler.transform(&reduced)?;

        tracing::info!(
            rows = table.height(),
            dropped = ?correlation.drop_list(),
            output_columns = scaled.width(),
            "pipeline fitted"
        );

        self.fitted = Some(FittedPreprocessor {
            feature_columns: self.config.feature_columns.clone(),
            outlier,
            correlation,
            scaler,
        });
        self.clamp_counts = clamp_counts;
        Ok(scaled)
    }

    /// Serving mode: validate the request and run the frozen stages.
    pub fn transform(&self, table: &DataFrame) -> Result<DataFrame, PipelineError> {
        let fitted = self.require_fitted()?;
        if fitted.feature_columns != self.config.feature_columns {
            return Err(PipelineError::FeatureSetMismatch {
                expected: fitted.feature_columns.clone(),
                found: self.config.feature_columns.clone(),
            });
        }
        validate_table(table, &fitted.feature_columns)?;
        fitted.transform(table)
    }

    /// Serving mode end to end: transform, score, and map to predictions.
    pub fn apply(
        &self,
        table: &DataFrame,
        scorer: &dyn ScoringAdapter,
        labels: &ClassLabels,
    ) -> Result<Vec<Prediction>, PipelineError> {
        let prepared = self.transform(table)?;
        let matrix = to_matrix(&prepared)?;
        let probabilities = scorer.predict_probability(&matrix)?;

        Ok(probabilities
            .into_iter()
            .map(|p| Prediction::from_probability(p, labels))
            .collect())
    }

    fn require_fitted(&self) -> Result<&FittedPreprocessor, PipelineError> {
        self.fitted.as_ref().ok_or_else(|| {
            PipelineError::Uninitialized(
                "no fitted parameters loaded; run training or load a parameter bundle".to_string(),
            )
        })
    }
}

/// Row-major copy of a fully numeric table into a dense matrix.
pub fn to_matrix(table: &DataFrame) -> Result<Mat<f64>, PipelineError> {
    let columns = table
        .get_column_names()
        .iter()
        .map(|name| dense_values(table, name, Stage::Scoring))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Mat::from_fn(table.height(), columns.len(), |row, col| {
        columns[col][row]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert_eq!(config.feature_columns.len(), 12);
        assert_eq!(config.outlier_columns.len(), 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_unknown_outlier_column() {
        let config = PipelineConfig::default().with_outlier_columns(vec!["Weight".to_string()]);
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_config_rejects_threshold_out_of_range() {
        let config = PipelineConfig::default().with_correlation_threshold(1.5);
        assert!(config.validate().is_err());
        let config = PipelineConfig::default().with_correlation_threshold(0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unfitted_pipeline_rejects_serving_calls() {
        let pipeline = Pipeline::new(PipelineConfig::default());
        let df = df! { "Area" => [1.0f64] }.unwrap();
        let err = pipeline.transform(&df).unwrap_err();
        assert!(matches!(err, PipelineError::Uninitialized(_)));
    }

    #[test]
    fn test_to_matrix_keeps_column_order() {
        let df = df! {
            "a" => [1.0f64, 2.0],
            "b" => [3.0f64, 4.0],
        }
        .unwrap();
        let m = to_matrix(&df).unwrap();
        assert_eq!((m.nrows(), m.ncols()), (2, 2));
        assert_eq!(m[(0, 1)], 3.0);
        assert_eq!(m[(1, 0)], 2.0);
    }
}

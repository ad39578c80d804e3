//! Scoring adapters - trained classifiers behind one `score(matrix)` capability

pub mod linear;
pub mod neural;

use faer::Mat;
use serde::{Deserialize, Serialize};

pub use linear::{LinearModelAdapter, LinearModelConfig};
pub use neural::{Activation, DenseLayer, NeuralNetAdapter};

/// Errors raised by a classifier.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("{model} expects {expected} feature(s), got {got}")]
    DimensionMismatch {
        model: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{model} produced a non-finite probability for row {row}")]
    NonFinite { model: &'static str, row: usize },

    #[error("invalid {model} parameters: {reason}")]
    InvalidParameters { model: &'static str, reason: String },

    #[error("cannot fit {model}: {reason}")]
    Fit { model: &'static str, reason: String },
}

/// A trained binary classifier that scores prepared feature matrices.
pub trait ScoringAdapter: Send + Sync {
    /// Short model name used in errors and reports.
    fn name(&self) -> &'static str;

    /// Number of input columns the model was trained on.
    fn n_features(&self) -> usize;

    /// Probability of the positive class for every row of `features`.
    fn predict_probability(&self, features: &Mat<f64>) -> Result<Vec<f64>, ScoringError>;

    /// Class ids (0 or 1) for every row of `features`.
    fn predict(&self, features: &Mat<f64>) -> Result<Vec<u8>, ScoringError> {
        Ok(self
            .predict_probability(features)?
            .into_iter()
            .map(|p| u8::from(p > 0.5))
            .collect())
    }
}

/// Reject matrices whose width differs from the model's input width.
pub(crate) fn check_width(
    model: &'static str,
    expected: usize,
    features: &Mat<f64>,
) -> Result<(), ScoringError> {
    if features.ncols() != expected {
        return Err(ScoringError::DimensionMismatch {
            model,
            expected,
            got: features.ncols(),
        });
    }
    Ok(())
}

/// Reject NaN or infinite probabilities.
pub(crate) fn check_finite(model: &'static str, probabilities: &[f64]) -> Result<(), ScoringError> {
    match probabilities.iter().position(|p| !p.is_finite()) {
        Some(row) => Err(ScoringError::NonFinite { model, row }),
        None => Ok(()),
    }
}

/// Numerically stable logistic function.
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Serializable classifier stored in the parameter bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classifier {
    Linear(LinearModelAdapter),
    NeuralNet(NeuralNetAdapter),
}

impl Classifier {
    pub fn adapter(&self) -> &dyn ScoringAdapter {
        match self {
            Classifier::Linear(m) => m,
            Classifier::NeuralNet(m) => m,
        }
    }

    /// Check internal consistency of the stored parameters.
    pub fn validate(&self) -> Result<(), ScoringError> {
        match self {
            Classifier::Linear(m) => m.validate(),
            Classifier::NeuralNet(m) => m.validate(),
        }
    }
}

impl ScoringAdapter for Classifier {
    fn name(&self) -> &'static str {
        self.adapter().name()
    }

    fn n_features(&self) -> usize {
        self.adapter().n_features()
    }

    fn predict_probability(&self, features: &Mat<f64>) -> Result<Vec<f64>, ScoringError> {
        self.adapter().predict_probability(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_is_stable_at_extremes() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(sigmoid(-800.0).is_finite());
    }

    #[test]
    fn test_classifier_serializes_with_kind_tag() {
        let clf = Classifier::Linear(LinearModelAdapter::new(vec![1.0, -2.0], 0.5));
        let json = serde_json::to_string(&clf).unwrap();
        assert!(json.contains(r#""kind":"linear""#), "{json}");

        let back: Classifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, clf);
        assert_eq!(back.n_features(), 2);
        assert_eq!(back.name(), "linear model");
    }
}

//! Logistic regression scoring and a deterministic batch gradient-descent fitter

use faer::Mat;
use serde::{Deserialize, Serialize};

use super::{check_finite, check_width, sigmoid, ScoringAdapter, ScoringError};

const MODEL_NAME: &str = "linear model";

/// Hyperparameters for [`LinearModelAdapter::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModelConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    /// L2 penalty on the weights (the intercept is not penalized)
    pub l2: f64,
    /// Weight classes inversely to their frequency
    pub balanced: bool,
}

impl Default for LinearModelConfig {
    fn default() -> Self {
        Self {
            epochs: 2000,
            learning_rate: 0.1,
            l2: 1e-3,
            balanced: true,
        }
    }
}

impl LinearModelConfig {
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_l2(mut self, l2: f64) -> Self {
        self.l2 = l2;
        self
    }

    pub fn with_balanced(mut self, balanced: bool) -> Self {
        self.balanced = balanced;
        self
    }
}

/// Logistic regression: `p = sigmoid(w . x + b)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModelAdapter {
    pub weights: Vec<f64>,
    pub intercept: f64,
}

impl LinearModelAdapter {
    pub fn new(weights: Vec<f64>, intercept: f64) -> Self {
        Self { weights, intercept }
    }

    /// Fit by full-batch gradient descent on the weighted log loss.
    ///
    /// Starts from zero weights and visits rows in order, so the same inputs
    /// always give the same model.
    pub fn fit(
        features: &Mat<f64>,
        labels: &[u8],
        config: &LinearModelConfig,
    ) -> Result<Self, ScoringError> {
        let (n_rows, n_cols) = (features.nrows(), features.ncols());

        if n_rows == 0 {
            return Err(fit_error("training matrix has no rows"));
        }
        if labels.len() != n_rows {
            return Err(fit_error(format!(
                "{} label(s) for {} row(s)",
                labels.len(),
                n_rows
            )));
        }
        if labels.iter().any(|&y| y > 1) {
            return Err(fit_error("labels must be 0 or 1"));
        }

        let positives = labels.iter().filter(|&&y| y == 1).count();
        let negatives = n_rows - positives;
        if positives == 0 || negatives == 0 {
            return Err(fit_error("training labels contain a single class"));
        }

        let (w_pos, w_neg) = if config.balanced {
            (
                n_rows as f64 / (2.0 * positives as f64),
                n_rows as f64 / (2.0 * negatives as f64),
            )
        } else {
            (1.0, 1.0)
        };
        let sample_weights: Vec<f64> = labels
            .iter()
            .map(|&y| if y == 1 { w_pos } else { w_neg })
            .collect();
        let total_weight: f64 = sample_weights.iter().sum();

        let mut model = Self::new(vec![0.0; n_cols], 0.0);
        let mut grad_w = vec![0.0; n_cols];

        for _ in 0..config.epochs {
            grad_w.iter_mut().for_each(|g| *g = 0.0);
            let mut grad_b = 0.0;

            for row in 0..n_rows {
                let residual =
                    sample_weights[row] * (model.probability_row(features, row) - labels[row] as f64);
                for (col, g) in grad_w.iter_mut().enumerate() {
                    *g += residual * features[(row, col)];
                }
                grad_b += residual;
            }

            for (w, g) in model.weights.iter_mut().zip(&grad_w) {
                *w -= config.learning_rate * (g / total_weight + config.l2 * *w);
            }
            model.intercept -= config.learning_rate * grad_b / total_weight;
        }

        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        if self.weights.is_empty() {
            return Err(ScoringError::InvalidParameters {
                model: MODEL_NAME,
                reason: "no weights".to_string(),
            });
        }
        if !self.intercept.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err(ScoringError::InvalidParameters {
                model: MODEL_NAME,
                reason: "non-finite weight".to_string(),
            });
        }
        Ok(())
    }

    fn probability_row(&self, features: &Mat<f64>, row: usize) -> f64 {
        let z = self
            .weights
            .iter()
            .enumerate()
            .fold(self.intercept, |acc, (col, w)| acc + w * features[(row, col)]);
        sigmoid(z)
    }
}

fn fit_error(reason: impl Into<String>) -> ScoringError {
    ScoringError::Fit {
        model: MODEL_NAME,
        reason: reason.into(),
    }
}

impl ScoringAdapter for LinearModelAdapter {
    fn name(&self) -> &'static str {
        MODEL_NAME
    }

    fn n_features(&self) -> usize {
        self.weights.len()
    }

    fn predict_probability(&self, features: &Mat<f64>) -> Result<Vec<f64>, ScoringError> {
        check_width(MODEL_NAME, self.weights.len(), features)?;
        let probabilities: Vec<f64> = (0..features.nrows())
            .map(|row| self.probability_row(features, row))
            .collect();
        check_finite(MODEL_NAME, &probabilities)?;
        Ok(probabilities)
    }
}

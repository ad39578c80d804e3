//! Feed-forward neural network scoring
//!
//! Weights come from an external trainer as JSON; only the forward pass lives
//! here. Dropout is a training-time layer and has no inference counterpart.

use faer::Mat;
use serde::{Deserialize, Serialize};

use super::{check_finite, check_width, sigmoid, ScoringAdapter, ScoringError};

const MODEL_NAME: &str = "neural network";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    Sigmoid,
    Linear,
}

impl Activation {
    fn apply(self, z: f64) -> f64 {
        match self {
            Activation::Relu => z.max(0.0),
            Activation::Sigmoid => sigmoid(z),
            Activation::Linear => z,
        }
    }
}

/// Fully connected layer; `weights[out][in]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    pub activation: Activation,
}

impl DenseLayer {
    pub fn inputs(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    pub fn outputs(&self) -> usize {
        self.weights.len()
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| {
                let z = row.iter().zip(input).fold(*b, |acc, (w, x)| acc + w * x);
                self.activation.apply(z)
            })
            .collect()
    }
}

/// Stack of dense layers ending in a single sigmoid unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralNetAdapter {
    pub layers: Vec<DenseLayer>,
}

impl NeuralNetAdapter {
    pub fn new(layers: Vec<DenseLayer>) -> Result<Self, ScoringError> {
        let net = Self { layers };
        net.validate()?;
        Ok(net)
    }

    /// Parse and validate network weights from JSON.
    pub fn from_json(json: &str) -> Result<Self, ScoringError> {
        let net: Self = serde_json::from_str(json).map_err(|e| invalid(e.to_string()))?;
        net.validate()?;
        Ok(net)
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        let first = self.layers.first().ok_or_else(|| invalid("network has no layers"))?;
        let mut width = first.inputs();
        if width == 0 {
            return Err(invalid("first layer has no inputs"));
        }

        for (idx, layer) in self.layers.iter().enumerate() {
            if layer.outputs() == 0 || layer.bias.len() != layer.outputs() {
                return Err(invalid(format!(
                    "layer {idx}: {} weight row(s) but {} bias value(s)",
                    layer.outputs(),
                    layer.bias.len()
                )));
            }
            if let Some(row) = layer.weights.iter().position(|r| r.len() != width) {
                return Err(invalid(format!(
                    "layer {idx}: weight row {row} has {} input(s), expected {width}",
                    layer.weights[row].len()
                )));
            }
            let all_finite = layer
                .weights
                .iter()
                .flatten()
                .chain(&layer.bias)
                .all(|v| v.is_finite());
            if !all_finite {
                return Err(invalid(format!("layer {idx}: non-finite parameter")));
            }
            width = layer.outputs();
        }

        let last = &self.layers[self.layers.len() - 1];
        if last.outputs() != 1 || last.activation != Activation::Sigmoid {
            return Err(invalid("output layer must be a single sigmoid unit"));
        }
        Ok(())
    }

    fn forward(&self, input: Vec<f64>) -> Result<f64, ScoringError> {
        let output = self
            .layers
            .iter()
            .fold(input, |activations, layer| layer.forward(&activations));
        output
            .first()
            .copied()
            .ok_or_else(|| invalid("network produced no output"))
    }
}

fn invalid(reason: impl Into<String>) -> ScoringError {
    ScoringError::InvalidParameters {
        model: MODEL_NAME,
        reason: reason.into(),
    }
}

impl ScoringAdapter for NeuralNetAdapter {
    fn name(&self) -> &'static str {
        MODEL_NAME
    }

    fn n_features(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::inputs)
    }

    fn predict_probability(&self, features: &Mat<f64>) -> Result<Vec<f64>, ScoringError> {
        // Layers built field by field have not been checked by `new`
        self.validate()?;
        check_width(MODEL_NAME, self.n_features(), features)?;
        let probabilities = (0..features.nrows())
            .map(|row| {
                let input: Vec<f64> = (0..features.ncols()).map(|col| features[(row, col)]).collect();
                self.forward(input)
            })
            .collect::<Result<Vec<f64>, ScoringError>>()?;
        check_finite(MODEL_NAME, &probabilities)?;
        Ok(probabilities)
    }
}

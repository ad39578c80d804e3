//! Mapping classifier probabilities to cultivar predictions

use serde::{Deserialize, Serialize};

/// Probability above which the positive class wins
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Names of the two cultivars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLabels {
    /// Class id 0
    pub negative: String,
    /// Class id 1
    pub positive: String,
}

impl Default for ClassLabels {
    fn default() -> Self {
        Self {
            negative: "Çerçevelik".to_string(),
            positive: "Ürgüp Sivrisi".to_string(),
        }
    }
}

impl ClassLabels {
    pub fn new(negative: impl Into<String>, positive: impl Into<String>) -> Self {
        Self {
            negative: negative.into(),
            positive: positive.into(),
        }
    }

    pub fn label(&self, class_id: u8) -> &str {
        if class_id == 1 {
            &self.positive
        } else {
            &self.negative
        }
    }
}

/// Outcome for one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub class_id: u8,
    pub label: String,
    /// Probability of the positive class as returned by the classifier
    pub probability: f64,
    /// Probability mass of the winning class, in [0.5, 1.0]
    pub confidence: f64,
}

impl Prediction {
    pub fn from_probability(probability: f64, labels: &ClassLabels) -> Self {
        let class_id = u8::from(probability > DECISION_THRESHOLD);
        let confidence = probability.max(1.0 - probability);
        Self {
            class_id,
            label: labels.label(class_id).to_string(),
            probability,
            confidence,
        }
    }

    /// Confidence as a percentage string, e.g. `"87.35%"`.
    pub fn confidence_percent(&self) -> String {
        format!("{:.2}%", self.confidence * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_class_above_half() {
        let p = Prediction::from_probability(0.8734, &ClassLabels::default());
        assert_eq!(p.class_id, 1);
        assert_eq!(p.label, "Ürgüp Sivrisi");
        assert_eq!(p.confidence_percent(), "87.34%");
    }

    #[test]
    fn test_exactly_half_is_negative() {
        let p = Prediction::from_probability(0.5, &ClassLabels::default());
        assert_eq!(p.class_id, 0);
        assert_eq!(p.label, "Çerçevelik");
        assert_eq!(p.confidence, 0.5);
    }

    #[test]
    fn test_negative_confidence_is_complement() {
        let p = Prediction::from_probability(0.1, &ClassLabels::default());
        assert_eq!(p.class_id, 0);
        assert!((p.confidence - 0.9).abs() < 1e-12);
    }
}

//! Correlation-based feature elimination
//!
//! For every pair of numeric columns whose absolute Pearson correlation exceeds
//! the threshold, the later-declared column is dropped. Decisions are made per
//! pair: a column already marked for removal still counts as the earlier member
//! of its pairs with later neighbours.

use faer::Mat;
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::pipeline::error::{PipelineError, Stage};
use crate::pipeline::scaler::{is_constant, is_degenerate_scale};
use crate::pipeline::schema::dense_values;

/// Default absolute correlation above which the later column is dropped
pub const DEFAULT_CORRELATION_THRESHOLD: f64 = 0.95;

/// Represents a correlated pair of features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedPair {
    /// Earlier column in table order (kept)
    pub feature1: String,
    /// Later column in table order (dropped)
    pub feature2: String,
    pub correlation: f64,
}

/// Compute the Pearson correlation matrix of the given columns.
///
/// Algorithm:
/// 1. Standardize each column: z = (x - mean) / (std * sqrt(n))
/// 2. Compute R = Z^T * Z
///
/// Entries involving a constant column are NaN, since its correlation is undefined.
pub fn correlation_matrix(columns: &[Vec<f64>]) -> Mat<f64> {
    let n_cols = columns.len();
    let n_rows = columns.first().map_or(0, Vec::len);

    // Standardize columns in parallel; None marks a constant column
    let standardized: Vec<Option<Vec<f64>>> = columns
        .par_iter()
        .map(|values| {
            let n = values.len() as f64;
            if values.is_empty() {
                return None;
            }
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
            let std = var.sqrt();
            if is_constant(values) || is_degenerate_scale(mean, std) {
                return None;
            }
            let scale = std * n.sqrt();
            Some(values.iter().map(|x| (x - mean) / scale).collect())
        })
        .collect();

    let mut z = Mat::<f64>::zeros(n_rows, n_cols);
    for (col_idx, col) in standardized.iter().enumerate() {
        if let Some(values) = col {
            for (row_idx, &v) in values.iter().enumerate() {
                z[(row_idx, col_idx)] = v;
            }
        }
    }

    let mut corr = z.transpose() * &z;
    for (i, col) in standardized.iter().enumerate() {
        if col.is_none() {
            for j in 0..n_cols {
                corr[(i, j)] = f64::NAN;
                corr[(j, i)] = f64::NAN;
            }
        }
    }
    corr
}

/// Extract pairs above the threshold from the upper triangle, in column order.
pub fn extract_correlated_pairs(
    corr_matrix: &Mat<f64>,
    col_names: &[String],
    threshold: f64,
) -> Vec<CorrelatedPair> {
    let n = corr_matrix.nrows();
    let mut pairs = Vec::new();

    for i in 0..n {
        for j in (i + 1)..n {
            let corr = corr_matrix[(i, j)];
            // NaN compares false, so undefined correlations never qualify
            if corr.abs() > threshold {
                pairs.push(CorrelatedPair {
                    feature1: col_names[i].clone(),
                    feature2: col_names[j].clone(),
                    correlation: corr,
                });
            }
        }
    }

    pairs
}

/// Later member of each pair, deduplicated and in table order.
pub fn select_features_to_drop(pairs: &[CorrelatedPair], column_order: &[String]) -> Vec<String> {
    column_order
        .iter()
        .filter(|name| pairs.iter().any(|p| &p.feature2 == *name))
        .cloned()
        .collect()
}

/// Unfitted correlation filter.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationFilter {
    threshold: f64,
}

impl Default for CorrelationFilter {
    fn default() -> Self {
        Self::new(DEFAULT_CORRELATION_THRESHOLD)
    }
}

impl CorrelationFilter {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Learn the drop list from the numeric columns of the reference table.
    pub fn fit(&self, reference: &DataFrame) -> Result<FittedCorrelationFilter, PipelineError> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "correlation threshold must be in (0, 1], got {}",
                self.threshold
            )));
        }

        let numeric_cols: Vec<String> = reference
            .get_columns()
            .iter()
            .filter(|col| col.dtype().is_primitive_numeric())
            .map(|col| col.name().to_string())
            .collect();

        let columns = numeric_cols
            .iter()
            .map(|name| dense_values(reference, name, Stage::CorrelationFilter))
            .collect::<Result<Vec<_>, _>>()?;

        let pairs = if columns.len() < 2 {
            Vec::new()
        } else {
            let corr = correlation_matrix(&columns);
            extract_correlated_pairs(&corr, &numeric_cols, self.threshold)
        };
        let drop_list = select_features_to_drop(&pairs, &numeric_cols);

        tracing::debug!(
            threshold = self.threshold,
            pairs = pairs.len(),
            dropped = ?drop_list,
            "fitted correlation filter"
        );

        Ok(FittedCorrelationFilter {
            threshold: self.threshold,
            drop_list,
            pairs,
        })
    }
}

/// Correlation filter with a frozen drop list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedCorrelationFilter {
    threshold: f64,
    drop_list: Vec<String>,
    /// Pairs found at fit time, kept for reporting
    pairs: Vec<CorrelatedPair>,
}

impl FittedCorrelationFilter {
    pub fn from_drop_list(threshold: f64, drop_list: Vec<String>) -> Self {
        Self {
            threshold,
            drop_list,
            pairs: Vec::new(),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn drop_list(&self) -> &[String] {
        &self.drop_list
    }

    pub fn pairs(&self) -> &[CorrelatedPair] {
        &self.pairs
    }

    /// Drop the stored columns. Every one of them must be present.
    pub fn transform(&self, table: &DataFrame) -> Result<DataFrame, PipelineError> {
        if let Some(missing) = self
            .drop_list
            .iter()
            .find(|name| table.column(name.as_str()).is_err())
        {
            return Err(PipelineError::StageColumnMissing {
                stage: Stage::CorrelationFilter,
                column: missing.clone(),
            });
        }

        Ok(table.drop_many(self.drop_list.iter().map(String::as_str)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_matrix_perfect_and_negative() {
        let a = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let b = vec![2.0, 4.0, 6.0, 8.0, 10.0];
        let c = vec![5.0, 4.0, 3.0, 2.0, 1.0];
        let corr = correlation_matrix(&[a, b, c]);

        assert!((corr[(0, 1)] - 1.0).abs() < 1e-12);
        assert!((corr[(0, 2)] + 1.0).abs() < 1e-12);
        assert!((corr[(1, 1)] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_has_undefined_correlation() {
        let corr = correlation_matrix(&[vec![1.0, 2.0, 3.0], vec![4.0, 4.0, 4.0]]);
        assert!(corr[(0, 1)].is_nan());

        let names = vec!["a".to_string(), "b".to_string()];
        assert!(extract_correlated_pairs(&corr, &names, 0.5).is_empty());
    }

    #[test]
    fn test_select_features_to_drop_keeps_table_order() {
        let order: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let pairs = vec![
            CorrelatedPair {
                feature1: "b".to_string(),
                feature2: "d".to_string(),
                correlation: 0.99,
            },
            CorrelatedPair {
                feature1: "a".to_string(),
                feature2: "c".to_string(),
                correlation: -0.97,
            },
            CorrelatedPair {
                feature1: "a".to_string(),
                feature2: "d".to_string(),
                correlation: 0.96,
            },
        ];
        assert_eq!(select_features_to_drop(&pairs, &order), vec!["c", "d"]);
    }
}

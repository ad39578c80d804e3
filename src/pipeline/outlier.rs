//! IQR-based outlier clamping
//!
//! Bounds are learned once from the training table and reused unchanged for
//! every later table; values outside `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]` are
//! replaced by the training median.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::pipeline::error::{InStage, PipelineError, Stage};
use crate::pipeline::schema::float_values;

/// Multiplier applied to the interquartile range
pub const IQR_FACTOR: f64 = 1.5;

/// Quantile of sorted values using linear interpolation between closest ranks.
///
/// The position is `q * (n - 1)`, matching the default definition used by
/// common dataframe libraries. `sorted` must be non-empty.
pub fn quantile_linear(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Frozen clamp parameters for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub column: String,
    pub lower: f64,
    pub upper: f64,
    /// Replacement for values outside the bounds
    pub median: f64,
}

impl OutlierBounds {
    /// Compute bounds from the non-null reference values of a column.
    pub fn from_values(column: &str, values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let q1 = quantile_linear(&sorted, 0.25);
        let q3 = quantile_linear(&sorted, 0.75);
        let iqr = q3 - q1;

        Some(Self {
            column: column.to_string(),
            lower: q1 - IQR_FACTOR * iqr,
            upper: q3 + IQR_FACTOR * iqr,
            median: quantile_linear(&sorted, 0.5),
        })
    }

    /// Values exactly on a bound are kept.
    pub fn contains(&self, value: f64) -> bool {
        !(value < self.lower || value > self.upper)
    }

    pub fn clamp(&self, value: f64) -> f64 {
        if self.contains(value) {
            value
        } else {
            self.median
        }
    }
}

/// Unfitted outlier clamp: the list of columns to clip.
#[derive(Debug, Clone, Default)]
pub struct OutlierClamp {
    columns: Vec<String>,
}

impl OutlierClamp {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Learn bounds and medians from the reference table.
    pub fn fit(&self, reference: &DataFrame) -> Result<FittedOutlierClamp, PipelineError> {
        let mut bounds = Vec::with_capacity(self.columns.len());

        for column in &self.columns {
            let values: Vec<f64> = float_values(reference, column, Stage::OutlierClamp)?
                .into_iter()
                .flatten()
                .filter(|v| !v.is_nan())
                .collect();

            let b = OutlierBounds::from_values(column, &values).ok_or_else(|| {
                PipelineError::EmptyColumn {
                    stage: Stage::OutlierClamp,
                    column: column.clone(),
                }
            })?;

            tracing::debug!(
                column = %column,
                lower = b.lower,
                upper = b.upper,
                median = b.median,
                "fitted outlier bounds"
            );
            bounds.push(b);
        }

        Ok(FittedOutlierClamp { bounds })
    }
}

/// Outlier clamp with frozen training-time bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedOutlierClamp {
    bounds: Vec<OutlierBounds>,
}

impl FittedOutlierClamp {
    pub fn from_bounds(bounds: Vec<OutlierBounds>) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> &[OutlierBounds] {
        &self.bounds
    }

    pub fn get(&self, column: &str) -> Option<&OutlierBounds> {
        self.bounds.iter().find(|b| b.column == column)
    }

    /// Replace out-of-bounds values with the stored medians.
    pub fn transform(&self, table: &DataFrame) -> Result<DataFrame, PipelineError> {
        self.transform_counted(table).map(|(df, _)| df)
    }

    /// Like [`transform`](Self::transform), also returning how many values
    /// were replaced in each clamped column.
    pub fn transform_counted(
        &self,
        table: &DataFrame,
    ) -> Result<(DataFrame, Vec<(String, usize)>), PipelineError> {
        let mut out = table.clone();
        let mut counts = Vec::with_capacity(self.bounds.len());

        for b in &self.bounds {
            if out.column(&b.column).is_err() {
                continue;
            }

            let mut replaced = 0usize;
            let clamped: Vec<Option<f64>> = float_values(&out, &b.column, Stage::OutlierClamp)?
                .into_iter()
                .map(|value| {
                    value.map(|v| {
                        if !b.contains(v) {
                            replaced += 1;
                        }
                        b.clamp(v)
                    })
                })
                .collect();

            out.with_column(Column::new(b.column.as_str().into(), clamped))
                .in_stage(Stage::OutlierClamp)?;
            counts.push((b.column.clone(), replaced));
        }

        Ok((out, counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_linear_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_linear(&sorted, 0.25), 1.75);
        assert_eq!(quantile_linear(&sorted, 0.5), 2.5);
        assert_eq!(quantile_linear(&sorted, 0.75), 3.25);
        assert_eq!(quantile_linear(&[7.0], 0.75), 7.0);
    }

    #[test]
    fn test_bounds_from_values() {
        let b = OutlierBounds::from_values("x", &[5.0, 1.0, 3.0, 2.0, 4.0]).unwrap();
        assert_eq!(b.lower, 2.0 - 1.5 * 2.0);
        assert_eq!(b.upper, 4.0 + 1.5 * 2.0);
        assert_eq!(b.median, 3.0);
        assert!(OutlierBounds::from_values("x", &[]).is_none());
    }

    #[test]
    fn test_bound_values_are_kept() {
        let b = OutlierBounds {
            column: "x".to_string(),
            lower: 0.0,
            upper: 10.0,
            median: 5.0,
        };
        assert_eq!(b.clamp(0.0), 0.0);
        assert_eq!(b.clamp(10.0), 10.0);
        assert_eq!(b.clamp(10.000001), 5.0);
        assert_eq!(b.clamp(-1.0), 5.0);
    }

    #[test]
    fn test_nulls_pass_through_transform() {
        let df = df! { "x" => [Some(1.0f64), None, Some(3.0), Some(100.0)] }.unwrap();
        let fitted = FittedOutlierClamp::from_bounds(vec![OutlierBounds {
            column: "x".to_string(),
            lower: 0.0,
            upper: 10.0,
            median: 2.0,
        }]);
        let (out, counts) = fitted.transform_counted(&df).unwrap();
        let values: Vec<Option<f64>> = out.column("x").unwrap().f64().unwrap().iter().collect();
        assert_eq!(values, vec![Some(1.0), None, Some(3.0), Some(2.0)]);
        assert_eq!(counts, vec![("x".to_string(), 1)]);
    }
}

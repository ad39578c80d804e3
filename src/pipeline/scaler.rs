//! Standard scaling (z-score) with frozen training statistics
//!
//! `z = (x - mean) / std`, where `std` is the population standard deviation
//! (ddof = 0) of the training column.

use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::pipeline::error::{InStage, PipelineError, Stage};
use crate::pipeline::schema::dense_values;

/// Relative tolerance under which a standard deviation counts as zero.
const DEGENERATE_STD_TOLERANCE: f64 = 10.0 * f64::EPSILON;

/// True when `std` carries no usable spread around `mean`.
///
/// Rounding leaves a constant column with a std of a few ulps rather than an
/// exact zero, so the comparison is relative to the magnitude of the mean.
pub(crate) fn is_degenerate_scale(mean: f64, std: f64) -> bool {
    !mean.is_finite()
        || !std.is_finite()
        || std <= DEGENERATE_STD_TOLERANCE * mean.abs().max(1.0)
}

/// True when every value equals the first one.
pub(crate) fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

/// Frozen statistics for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleParameters {
    pub column: String,
    pub mean: f64,
    pub std: f64,
}

/// Unfitted standard scaler.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureScaler;

impl FeatureScaler {
    pub fn new() -> Self {
        Self
    }

    /// Learn mean and population std for every column of the reference table.
    ///
    /// A constant column, or one whose std is zero up to rounding, is an error
    /// rather than a silent division by (nearly) zero.
    pub fn fit(&self, reference: &DataFrame) -> Result<FittedFeatureScaler, PipelineError> {
        if reference.height() == 0 {
            return Err(PipelineError::EmptyTable {
                stage: Stage::FeatureScaler,
            });
        }

        let names: Vec<String> = reference
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let columns = names
            .iter()
            .map(|name| dense_values(reference, name, Stage::FeatureScaler))
            .collect::<Result<Vec<_>, _>>()?;

        let fitted: Vec<(ScaleParameters, bool)> = names
            .par_iter()
            .zip(columns.par_iter())
            .map(|(name, values)| {
                let n = values.len() as f64;
                let mean = values.iter().sum::<f64>() / n;
                let var = values.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
                let std = var.sqrt();
                let degenerate = is_constant(values) || is_degenerate_scale(mean, std);
                (
                    ScaleParameters {
                        column: name.clone(),
                        mean,
                        std,
                    },
                    degenerate,
                )
            })
            .collect();

        if let Some((p, _)) = fitted.iter().find(|(_, degenerate)| *degenerate) {
            return Err(PipelineError::DegenerateData {
                stage: Stage::FeatureScaler,
                column: p.column.clone(),
            });
        }
        let params: Vec<ScaleParameters> = fitted.into_iter().map(|(p, _)| p).collect();

        tracing::debug!(columns = params.len(), "fitted feature scaler");
        Ok(FittedFeatureScaler { columns: params })
    }
}

/// Standard scaler with frozen per-column statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedFeatureScaler {
    columns: Vec<ScaleParameters>,
}

impl FittedFeatureScaler {
    pub fn from_parameters(columns: Vec<ScaleParameters>) -> Self {
        Self { columns }
    }

    pub fn parameters(&self) -> &[ScaleParameters] {
        &self.columns
    }

    /// Column names in fit-time order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|p| p.column.clone()).collect()
    }

    /// Standardize the fitted columns; the output holds only those columns,
    /// in fit-time order.
    pub fn transform(&self, table: &DataFrame) -> Result<DataFrame, PipelineError> {
        let scaled = self
            .columns
            .iter()
            .map(|p| {
                if is_degenerate_scale(p.mean, p.std) {
                    return Err(PipelineError::DegenerateData {
                        stage: Stage::FeatureScaler,
                        column: p.column.clone(),
                    });
                }
                let values: Vec<f64> = dense_values(table, &p.column, Stage::FeatureScaler)?
                    .into_iter()
                    .map(|x| (x - p.mean) / p.std)
                    .collect();
                Ok(Column::new(p.column.as_str().into(), values))
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;

        DataFrame::new(scaled).in_stage(Stage::FeatureScaler)
    }
}

//! Target column analysis and mapping
//!
//! The training table carries the variety as a label column (`Class`). This
//! module maps it onto the 0/1 ids the classifiers are fitted on.

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::pipeline::prediction::ClassLabels;

/// Default name of the label column in the seed dataset
pub const DEFAULT_TARGET_COLUMN: &str = "Class";

/// Tolerance for floating point comparison when checking binary 0/1 values
const TOLERANCE: f64 = 1e-9;

/// Mapping configuration for converting target column values to binary 0/1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetMapping {
    /// Value that maps to 1 (event)
    pub event_value: String,
    /// Value that maps to 0 (non-event)
    pub non_event_value: String,
}

impl TargetMapping {
    pub fn new(event_value: String, non_event_value: String) -> Self {
        Self {
            event_value,
            non_event_value,
        }
    }

    /// Labels reported for class ids 0 and 1.
    pub fn class_labels(&self) -> ClassLabels {
        ClassLabels::new(self.non_event_value.clone(), self.event_value.clone())
    }
}

impl Default for TargetMapping {
    fn default() -> Self {
        let labels = ClassLabels::default();
        Self::new(labels.positive, labels.negative)
    }
}

/// Result of analyzing a target column
#[derive(Debug, Clone)]
pub enum TargetAnalysis {
    /// Target column is already binary 0/1, no mapping needed
    AlreadyBinary,
    /// Target column needs mapping - contains these unique values
    NeedsMapping { unique_values: Vec<String> },
}

/// Analyze a target column to determine if it needs value mapping
///
/// # Returns
/// - `AlreadyBinary` if the column contains only 0 and 1 values
/// - `NeedsMapping` with the sorted unique values otherwise
pub fn analyze_target_column(df: &DataFrame, target: &str) -> Result<TargetAnalysis> {
    let target_col = df
        .column(target)
        .with_context(|| format!("Target column '{}' not found", target))?;

    if target_col.len() == 0 {
        anyhow::bail!("Target column '{}' is empty", target);
    }

    if target_col.null_count() == target_col.len() {
        anyhow::bail!("Target column '{}' contains only null values", target);
    }

    if target_col.dtype().is_primitive_numeric() {
        let float_col = target_col.cast(&DataType::Float64)?;
        let unique = float_col.unique()?;
        let unique_values: Vec<f64> = unique.f64()?.into_iter().flatten().collect();

        let is_binary = unique_values.len() <= 2
            && unique_values
                .iter()
                .all(|&v| v.abs() < TOLERANCE || (v - 1.0).abs() < TOLERANCE);

        if is_binary {
            return Ok(TargetAnalysis::AlreadyBinary);
        }
    }

    let mut unique_values: Vec<String> = column_to_string_vec(&target_col.unique()?)?
        .into_iter()
        .flatten()
        .collect();
    unique_values.sort();

    if unique_values.is_empty() {
        anyhow::bail!("Target column '{}' has no valid (non-null) values", target);
    }

    Ok(TargetAnalysis::NeedsMapping { unique_values })
}

/// Create a binary target mask based on the mapping
///
/// Returns `Some(1)` for event values, `Some(0)` for non-event values and
/// `None` for anything else.
pub fn create_target_mask(
    df: &DataFrame,
    target: &str,
    mapping: &TargetMapping,
) -> Result<Vec<Option<u8>>> {
    let target_col = df
        .column(target)
        .with_context(|| format!("Target column '{}' not found", target))?;

    let mask = column_to_string_vec(target_col)?
        .iter()
        .map(|v| match v {
            Some(s) if s == &mapping.event_value => Some(1),
            Some(s) if s == &mapping.non_event_value => Some(0),
            _ => None,
        })
        .collect();

    Ok(mask)
}

/// Encode the target column as class ids, failing on any unmapped value.
///
/// Columns that are already 0/1 are taken as-is.
pub fn encode_target(df: &DataFrame, target: &str, mapping: &TargetMapping) -> Result<Vec<u8>> {
    let mask = match analyze_target_column(df, target)? {
        TargetAnalysis::AlreadyBinary => {
            let col = df.column(target)?.cast(&DataType::Float64)?;
            col.f64()?
                .into_iter()
                .map(|v| v.map(|x| u8::from(x > 0.5)))
                .collect()
        }
        TargetAnalysis::NeedsMapping { .. } => create_target_mask(df, target, mapping)?,
    };

    if let Some(row) = mask.iter().position(Option::is_none) {
        let unmapped = mask.iter().filter(|v| v.is_none()).count();
        anyhow::bail!(
            "Target column '{}' has {} value(s) matching neither '{}' nor '{}' (first at row {})",
            target,
            unmapped,
            mapping.event_value,
            mapping.non_event_value,
            row
        );
    }

    Ok(mask.into_iter().flatten().collect())
}

/// Convert a column to a Vec of Option<String> for comparison
fn column_to_string_vec(col: &Column) -> Result<Vec<Option<String>>> {
    let values: Vec<Option<String>> = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            let cast = col.cast(&DataType::Int64)?;
            cast.i64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            let cast = col.cast(&DataType::UInt64)?;
            cast.u64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::Float32 | DataType::Float64 => {
            let cast = col.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| v.map(|n| format!("{}", n)))
                .collect()
        }
        DataType::Boolean => col
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| b.to_string()))
            .collect(),
        _ => {
            let cast = col.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.map(|s| s.to_string()))
                .collect()
        }
    };

    Ok(values)
}

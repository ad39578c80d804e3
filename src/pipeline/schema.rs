//! Input schema for seed measurements and table validation

use std::fmt;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::pipeline::error::{InStage, PipelineError, RangeViolation, Stage};

/// The 12 morphological measurements, in canonical column order.
pub const FEATURE_COLUMNS: [&str; 12] = [
    "Area",
    "Perimeter",
    "Major_Axis_Length",
    "Minor_Axis_Length",
    "Convex_Area",
    "Equiv_Diameter",
    "Eccentricity",
    "Solidity",
    "Extent",
    "Roundness",
    "Aspect_Ration",
    "Compactness",
];

/// Size measurements clipped by the outlier clamp unless configured otherwise.
pub const DEFAULT_OUTLIER_COLUMNS: [&str; 6] = [
    "Area",
    "Perimeter",
    "Major_Axis_Length",
    "Minor_Axis_Length",
    "Convex_Area",
    "Equiv_Diameter",
];

/// Canonical feature columns as owned strings.
pub fn feature_columns() -> Vec<String> {
    FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect()
}

/// Valid open interval for a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureDomain {
    /// (0, +inf)
    Positive,
    /// (0, 1)
    UnitInterval,
    /// (0, 4)
    AspectRatio,
    /// Any finite value
    Finite,
}

impl FeatureDomain {
    pub fn for_column(name: &str) -> Self {
        match name {
            "Eccentricity" | "Solidity" | "Extent" | "Roundness" | "Compactness" => {
                FeatureDomain::UnitInterval
            }
            "Aspect_Ration" => FeatureDomain::AspectRatio,
            "Area" | "Perimeter" | "Major_Axis_Length" | "Minor_Axis_Length" | "Convex_Area"
            | "Equiv_Diameter" => FeatureDomain::Positive,
            _ => FeatureDomain::Finite,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self {
            FeatureDomain::Positive => value > 0.0,
            FeatureDomain::UnitInterval => value > 0.0 && value < 1.0,
            FeatureDomain::AspectRatio => value > 0.0 && value < 4.0,
            FeatureDomain::Finite => true,
        }
    }
}

impl fmt::Display for FeatureDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureDomain::Positive => f.write_str("(0, +inf)"),
            FeatureDomain::UnitInterval => f.write_str("(0, 1)"),
            FeatureDomain::AspectRatio => f.write_str("(0, 4)"),
            FeatureDomain::Finite => f.write_str("finite values"),
        }
    }
}

/// One seed's measurements, as received by the single-record endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedRecord {
    #[serde(rename = "Area")]
    pub area: f64,
    #[serde(rename = "Perimeter")]
    pub perimeter: f64,
    #[serde(rename = "Major_Axis_Length")]
    pub major_axis_length: f64,
    #[serde(rename = "Minor_Axis_Length")]
    pub minor_axis_length: f64,
    #[serde(rename = "Convex_Area")]
    pub convex_area: f64,
    #[serde(rename = "Equiv_Diameter")]
    pub equiv_diameter: f64,
    #[serde(rename = "Eccentricity")]
    pub eccentricity: f64,
    #[serde(rename = "Solidity")]
    pub solidity: f64,
    #[serde(rename = "Extent")]
    pub extent: f64,
    #[serde(rename = "Roundness")]
    pub roundness: f64,
    #[serde(rename = "Aspect_Ration")]
    pub aspect_ration: f64,
    #[serde(rename = "Compactness")]
    pub compactness: f64,
}

impl SeedRecord {
    /// Values in [`FEATURE_COLUMNS`] order.
    pub fn values(&self) -> [f64; 12] {
        [
            self.area,
            self.perimeter,
            self.major_axis_length,
            self.minor_axis_length,
            self.convex_area,
            self.equiv_diameter,
            self.eccentricity,
            self.solidity,
            self.extent,
            self.roundness,
            self.aspect_ration,
            self.compactness,
        ]
    }

    pub fn from_values(v: [f64; 12]) -> Self {
        Self {
            area: v[0],
            perimeter: v[1],
            major_axis_length: v[2],
            minor_axis_length: v[3],
            convex_area: v[4],
            equiv_diameter: v[5],
            eccentricity: v[6],
            solidity: v[7],
            extent: v[8],
            roundness: v[9],
            aspect_ration: v[10],
            compactness: v[11],
        }
    }
}

/// Build a feature table from records, one row per record.
pub fn records_to_frame(records: &[SeedRecord]) -> PolarsResult<DataFrame> {
    let rows: Vec<[f64; 12]> = records.iter().map(SeedRecord::values).collect();
    let columns: Vec<Column> = FEATURE_COLUMNS
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let values: Vec<f64> = rows.iter().map(|row| row[idx]).collect();
            Column::new((*name).into(), values)
        })
        .collect();
    DataFrame::new(columns)
}

/// Names that occur more than once once surrounding whitespace is trimmed,
/// in first-seen order.
pub fn duplicate_trimmed_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<&str> = Vec::new();
    let mut duplicates: Vec<String> = Vec::new();
    for name in names.into_iter().map(str::trim) {
        if seen.contains(&name) {
            if !duplicates.iter().any(|d| d == name) {
                duplicates.push(name.to_string());
            }
        } else {
            seen.push(name);
        }
    }
    duplicates
}

/// Trim surrounding whitespace from every column name.
///
/// Names that collide after trimming are a [`PipelineError::DuplicateColumns`].
pub fn normalize_column_names(df: &mut DataFrame) -> Result<(), PipelineError> {
    let duplicates = duplicate_trimmed_names(df.get_column_names().iter().map(|s| s.as_str()));
    if !duplicates.is_empty() {
        return Err(PipelineError::DuplicateColumns {
            columns: duplicates,
        });
    }

    let renames: Vec<(String, String)> = df
        .get_column_names()
        .iter()
        .filter_map(|name| {
            let trimmed = name.trim();
            (trimmed != name.as_str()).then(|| (name.to_string(), trimmed.to_string()))
        })
        .collect();

    for (old, new) in renames {
        df.rename(&old, new.into()).in_stage(Stage::Validation)?;
    }
    Ok(())
}

/// Required columns absent from the table, in required order.
pub fn missing_columns(df: &DataFrame, required: &[String]) -> Vec<String> {
    let present: Vec<&str> = df.get_column_names().iter().map(|s| s.as_str()).collect();
    required
        .iter()
        .filter(|name| !present.contains(&name.as_str()))
        .cloned()
        .collect()
}

/// Check that every required column exists, is numeric and stays inside its domain.
///
/// All problems of one kind are reported together so a caller can fix the
/// whole request at once.
pub fn validate_table(df: &DataFrame, required: &[String]) -> Result<(), PipelineError> {
    let missing = missing_columns(df, required);
    if !missing.is_empty() {
        return Err(PipelineError::MissingColumns { columns: missing });
    }

    if df.height() == 0 {
        return Err(PipelineError::EmptyTable {
            stage: Stage::Validation,
        });
    }

    let mut violations = Vec::new();
    for name in required {
        let domain = FeatureDomain::for_column(name);
        let values = float_values(df, name, Stage::Validation)?;
        for (row, value) in values.into_iter().enumerate() {
            match value {
                Some(v) if domain.contains(v) => {}
                other => violations.push(RangeViolation {
                    column: name.clone(),
                    row,
                    value: other,
                    domain,
                }),
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::OutOfRange { violations })
    }
}

/// Read a numeric column as `f64`, keeping nulls.
pub(crate) fn float_values(
    df: &DataFrame,
    column: &str,
    stage: Stage,
) -> Result<Vec<Option<f64>>, PipelineError> {
    let col = df
        .column(column)
        .map_err(|_| PipelineError::StageColumnMissing {
            stage,
            column: column.to_string(),
        })?;

    if !col.dtype().is_primitive_numeric() {
        return Err(PipelineError::NonNumericColumn {
            column: column.to_string(),
            dtype: col.dtype().to_string(),
        });
    }

    let cast = col.cast(&DataType::Float64).in_stage(stage)?;
    let values = cast.f64().in_stage(stage)?.iter().collect();
    Ok(values)
}

/// Read a numeric column that must be fully populated with finite values.
pub(crate) fn dense_values(
    df: &DataFrame,
    column: &str,
    stage: Stage,
) -> Result<Vec<f64>, PipelineError> {
    float_values(df, column, stage)?
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(PipelineError::InvalidValue {
                stage,
                column: column.to_string(),
                row,
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domains_are_open_intervals() {
        assert!(!FeatureDomain::UnitInterval.contains(0.0));
        assert!(!FeatureDomain::UnitInterval.contains(1.0));
        assert!(FeatureDomain::UnitInterval.contains(0.5));
        assert!(FeatureDomain::AspectRatio.contains(3.99));
        assert!(!FeatureDomain::AspectRatio.contains(4.0));
        assert!(!FeatureDomain::Positive.contains(0.0));
        assert!(!FeatureDomain::Positive.contains(f64::INFINITY));
        assert!(!FeatureDomain::Finite.contains(f64::NAN));
    }

    #[test]
    fn test_column_domains() {
        assert_eq!(FeatureDomain::for_column("Area"), FeatureDomain::Positive);
        assert_eq!(
            FeatureDomain::for_column("Eccentricity"),
            FeatureDomain::UnitInterval
        );
        assert_eq!(
            FeatureDomain::for_column("Aspect_Ration"),
            FeatureDomain::AspectRatio
        );
        assert_eq!(FeatureDomain::for_column("id"), FeatureDomain::Finite);
    }

    #[test]
    fn test_normalize_column_names_trims_whitespace() {
        let mut df = df! {
            " Area " => [1.0f64],
            "Extent" => [0.5f64],
        }
        .unwrap();
        normalize_column_names(&mut df).unwrap();
        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["Area", "Extent"]);
    }

    #[test]
    fn test_normalize_column_names_rejects_collisions() {
        let mut df = df! {
            "Area" => [1.0f64],
            " Area " => [2.0f64],
            "Extent" => [0.5f64],
        }
        .unwrap();
        match normalize_column_names(&mut df) {
            Err(PipelineError::DuplicateColumns { columns }) => assert_eq!(columns, vec!["Area"]),
            other => panic!("expected DuplicateColumns, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_trimmed_names_reports_each_once() {
        let names = ["Area", "Area ", " Area", "Extent", "Perimeter", "Perimeter\t"];
        assert_eq!(duplicate_trimmed_names(names), vec!["Area", "Perimeter"]);
        assert!(duplicate_trimmed_names(["Area", "Extent"]).is_empty());
    }

    #[test]
    fn test_record_round_trips_through_values() {
        let values = [
            56276.0, 888.242, 326.1485, 220.2388, 56831.0, 267.6805, 0.7376, 0.9902, 0.7453,
            0.8963, 1.4809, 0.8207,
        ];
        let record = SeedRecord::from_values(values);
        assert_eq!(record.values(), values);
        assert_eq!(record.aspect_ration, 1.4809);
    }

    #[test]
    fn test_record_rejects_unknown_field() {
        let json = r#"{"Area": 1.0, "Bogus": 2.0}"#;
        assert!(serde_json::from_str::<SeedRecord>(json).is_err());
    }

    #[test]
    fn test_dense_values_rejects_nulls() {
        let df = df! { "a" => [Some(1.0f64), None] }.unwrap();
        let err = dense_values(&df, "a", Stage::FeatureScaler).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidValue { row: 1, .. }));
    }
}

//! Shared test utilities and fixture generators
#![allow(dead_code)]

use std::f64::consts::PI;
use std::path::PathBuf;

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use seedsort::model::{Classifier, LinearModelAdapter, LinearModelConfig};
use seedsort::pipeline::{
    encode_target, to_matrix, ClassLabels, ParameterBundle, Pipeline, PipelineConfig, SeedRecord,
    TargetMapping, FEATURE_COLUMNS,
};

pub const TARGET: &str = "Class";
pub const CERCEVELIK: &str = "Çerçevelik";
pub const URGUP_SIVRISI: &str = "Ürgüp Sivrisi";

/// Measurements of one synthetic seed, in `FEATURE_COLUMNS` order.
///
/// Derived from an ellipse so every value lies inside its domain: Ürgüp
/// Sivrisi seeds are longer and more elongated than Çerçevelik seeds.
pub fn synthetic_seed(rng: &mut StdRng, class_id: u8) -> [f64; 12] {
    let (major, aspect) = if class_id == 1 {
        (rng.gen_range(490.0..570.0), rng.gen_range(2.2..2.8))
    } else {
        (rng.gen_range(410.0..490.0), rng.gen_range(1.7..2.2))
    };
    let minor = major / aspect;
    let fill: f64 = rng.gen_range(0.97..1.0);
    let area = PI / 4.0 * major * minor * fill;

    let (a, b) = (major / 2.0, minor / 2.0);
    let ellipse_perimeter = PI * (3.0 * (a + b) - ((3.0 * a + b) * (a + 3.0 * b)).sqrt());
    let perimeter = ellipse_perimeter * rng.gen_range(1.0..1.04);

    let solidity: f64 = rng.gen_range(0.980..0.995);
    let convex_area = area / solidity;
    let equiv_diameter = (4.0 * area / PI).sqrt();
    let eccentricity = (1.0 - (minor / major).powi(2)).sqrt();
    let extent = area / (major * minor) * rng.gen_range(0.85..0.95);
    let roundness = 4.0 * PI * area / (perimeter * perimeter);
    let compactness = equiv_diameter / major;

    [
        area.round(),
        perimeter,
        major,
        minor,
        convex_area.round(),
        equiv_diameter,
        eccentricity,
        solidity,
        extent,
        roundness,
        aspect,
        compactness,
    ]
}

/// Seeded list of records with alternating classes.
pub fn create_seed_records(rows: usize, seed: u64) -> (Vec<SeedRecord>, Vec<u8>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let labels: Vec<u8> = (0..rows).map(|i| (i % 2) as u8).collect();
    let records = labels
        .iter()
        .map(|&c| SeedRecord::from_values(synthetic_seed(&mut rng, c)))
        .collect();
    (records, labels)
}

/// Seeded training table: the 12 features plus a `Class` label column.
pub fn create_seed_dataframe(rows: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let classes: Vec<u8> = (0..rows).map(|i| (i % 2) as u8).collect();
    let seeds: Vec<[f64; 12]> = classes
        .iter()
        .map(|&c| synthetic_seed(&mut rng, c))
        .collect();

    let mut columns: Vec<Column> = FEATURE_COLUMNS
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let values: Vec<f64> = seeds.iter().map(|s| s[j]).collect();
            Column::new((*name).into(), values)
        })
        .collect();
    let labels: Vec<&str> = classes
        .iter()
        .map(|&c| if c == 1 { URGUP_SIVRISI } else { CERCEVELIK })
        .collect();
    columns.push(Column::new(TARGET.into(), labels));

    DataFrame::new(columns).unwrap()
}

/// Train a pipeline and a quick linear model into a bundle.
pub fn fit_bundle(df: &DataFrame) -> ParameterBundle {
    let config = PipelineConfig::default();
    let mut pipeline = Pipeline::new(config.clone());
    let prepared = pipeline.fit_transform(df).unwrap();

    let labels = encode_target(df, TARGET, &TargetMapping::default()).unwrap();
    let matrix = to_matrix(&prepared).unwrap();
    let model = LinearModelAdapter::fit(
        &matrix,
        &labels,
        &LinearModelConfig::default().with_epochs(300),
    )
    .unwrap();

    ParameterBundle::new(
        config,
        pipeline.into_fitted().unwrap(),
        Classifier::Linear(model),
        ClassLabels::default(),
    )
    .unwrap()
}

/// A table with the 12 features set to one record's values.
pub fn single_row(values: [f64; 12]) -> DataFrame {
    let columns: Vec<Column> = FEATURE_COLUMNS
        .iter()
        .zip(values)
        .map(|(name, v)| Column::new((*name).into(), [v]))
        .collect();
    DataFrame::new(columns).unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("test_data.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Column values as f64, for assertions.
pub fn column_values(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap())
        .collect()
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}

/// Assert that a DataFrame does NOT contain specific columns
pub fn assert_missing_columns(df: &DataFrame, unexpected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in unexpected_cols {
        assert!(
            !actual_cols.contains(&col.to_string()),
            "Unexpected column still present: '{}'",
            col
        );
    }
}

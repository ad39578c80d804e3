//! Unit tests for dataset loading and saving

use polars::prelude::*;
use seedsort::pipeline::{load_dataset, load_dataset_with_progress, save_dataset};
use std::io::Write;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

fn names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_load_csv_file() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("seeds.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(file, "Area,Perimeter,Class").unwrap();
    writeln!(file, "56276,888.242,Çerçevelik").unwrap();
    writeln!(file, "76631,1068.146,Ürgüp Sivrisi").unwrap();
    drop(file);

    let (df, rows, cols) = load_dataset_with_progress(&csv_path, 100).unwrap();

    assert_eq!(rows, 2, "Should have 2 data rows");
    assert_eq!(cols, 3, "Should have 3 columns");
    assert_eq!(names(&df), vec!["Area", "Perimeter", "Class"]);
}

#[test]
fn test_load_parquet_file() {
    let mut df = common::create_seed_dataframe(20, 1);
    let (_dir, path) = common::create_temp_parquet(&mut df);

    let (loaded, rows, cols) = load_dataset_with_progress(&path, 100).unwrap();

    assert_eq!(rows, 20);
    assert_eq!(cols, 13);
    assert!(loaded.equals(&df));
}

#[test]
fn test_headers_are_trimmed() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("padded.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(file, " Area ,Perimeter  ,  Class").unwrap();
    writeln!(file, "56276,888.242,Çerçevelik").unwrap();
    drop(file);

    let df = load_dataset(&csv_path, 100).unwrap();
    assert_eq!(names(&df), vec!["Area", "Perimeter", "Class"]);
}

#[test]
fn test_csv_round_trip_keeps_seed_values() {
    let mut df = common::create_seed_dataframe(15, 2);
    let (_dir, path) = common::create_temp_csv(&mut df);

    let loaded = load_dataset(&path, 0).unwrap();
    assert_eq!(loaded.shape(), df.shape());
    assert_eq!(
        common::column_values(&loaded, "Eccentricity"),
        common::column_values(&df, "Eccentricity")
    );
}

#[test]
fn test_unsupported_format() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("seeds.xlsx");
    std::fs::write(&path, b"not a table").unwrap();

    let err = load_dataset(&path, 100).unwrap_err();
    assert!(err.to_string().contains("Unsupported file format"), "{err}");
}

#[test]
fn test_missing_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let result = load_dataset(&temp_dir.path().join("absent.csv"), 100);
    assert!(result.is_err());
}

#[test]
fn test_extension_is_case_insensitive() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("SEEDS.CSV");
    std::fs::write(&path, "a,b\n1,2\n").unwrap();

    let df = load_dataset(&path, 100).unwrap();
    assert_eq!(df.shape(), (1, 2));
}

#[test]
fn test_save_csv_and_parquet() {
    let temp_dir = TempDir::new().unwrap();
    let mut df = common::create_seed_dataframe(10, 3);

    for name in ["out.csv", "out.parquet"] {
        let path = temp_dir.path().join(name);
        save_dataset(&mut df, &path).unwrap();
        assert!(path.exists());

        let loaded = load_dataset(&path, 0).unwrap();
        assert_eq!(loaded.shape(), df.shape(), "{name}");
    }
}

#[test]
fn test_save_unsupported_format() {
    let temp_dir = TempDir::new().unwrap();
    let mut df = common::create_seed_dataframe(4, 4);

    let err = save_dataset(&mut df, &temp_dir.path().join("out.json")).unwrap_err();
    assert!(err.to_string().contains("Unsupported output format"));
}

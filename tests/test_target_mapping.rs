//! Tests for target column analysis and encoding

use polars::prelude::*;
use seedsort::pipeline::{
    analyze_target_column, create_target_mask, encode_target, ClassLabels, TargetAnalysis,
    TargetMapping, DEFAULT_TARGET_COLUMN,
};

#[path = "common/mod.rs"]
mod common;

#[test]
fn test_seed_dataset_needs_mapping() {
    let df = common::create_seed_dataframe(10, 1);

    match analyze_target_column(&df, DEFAULT_TARGET_COLUMN).unwrap() {
        TargetAnalysis::NeedsMapping { unique_values } => {
            assert_eq!(
                unique_values,
                vec![common::CERCEVELIK, common::URGUP_SIVRISI]
            );
        }
        TargetAnalysis::AlreadyBinary => panic!("Expected NeedsMapping"),
    }
}

#[test]
fn test_float_binary_target_is_detected() {
    let df = df! {
        "Class" => [0.0f64, 1.0, 1.0, 0.0],
    }
    .unwrap();

    assert!(matches!(
        analyze_target_column(&df, "Class").unwrap(),
        TargetAnalysis::AlreadyBinary
    ));
}

#[test]
fn test_numeric_non_binary_target_needs_mapping() {
    let df = df! {
        "Class" => [1i32, 2, 1, 2],
    }
    .unwrap();

    match analyze_target_column(&df, "Class").unwrap() {
        TargetAnalysis::NeedsMapping { unique_values } => {
            assert_eq!(unique_values, vec!["1", "2"]);
        }
        TargetAnalysis::AlreadyBinary => panic!("Expected NeedsMapping"),
    }
}

#[test]
fn test_missing_target_column() {
    let df = common::create_seed_dataframe(4, 2).drop("Class").unwrap();
    let err = analyze_target_column(&df, "Class").unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_empty_target_column() {
    let df = df! { "Class" => Vec::<String>::new() }.unwrap();
    let err = analyze_target_column(&df, "Class").unwrap_err();
    assert!(err.to_string().contains("empty"));
}

#[test]
fn test_default_mapping_encodes_seed_labels() {
    let df = common::create_seed_dataframe(6, 3);
    let encoded = encode_target(&df, common::TARGET, &TargetMapping::default()).unwrap();
    assert_eq!(encoded, vec![0, 1, 0, 1, 0, 1]);
}

#[test]
fn test_swapped_mapping_flips_classes() {
    let df = common::create_seed_dataframe(4, 4);
    let mapping = TargetMapping::new(common::CERCEVELIK.to_string(), common::URGUP_SIVRISI.to_string());

    let encoded = encode_target(&df, common::TARGET, &mapping).unwrap();
    assert_eq!(encoded, vec![1, 0, 1, 0]);
    assert_eq!(mapping.class_labels().label(1), common::CERCEVELIK);
}

#[test]
fn test_null_label_is_rejected() {
    let df = df! {
        "Class" => [Some(common::CERCEVELIK), None, Some(common::URGUP_SIVRISI)],
    }
    .unwrap();

    let err = encode_target(&df, "Class", &TargetMapping::default()).unwrap_err();
    assert!(err.to_string().contains("row 1"), "{err}");
}

#[test]
fn test_mask_on_numeric_labels() {
    let df = df! {
        "Class" => [1i64, 2, 3, 2],
    }
    .unwrap();

    let mapping = TargetMapping::new("2".to_string(), "1".to_string());
    let mask = create_target_mask(&df, "Class", &mapping).unwrap();
    assert_eq!(mask, vec![Some(0), Some(1), None, Some(1)]);
}

#[test]
fn test_mapping_labels_follow_class_ids() {
    let mapping = TargetMapping::new("yes".to_string(), "no".to_string());
    assert_eq!(mapping.class_labels(), ClassLabels::new("no", "yes"));
}

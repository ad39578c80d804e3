//! Dataset loading and saving for CSV and Parquet files

use anyhow::{Context, Result};
use polars::prelude::*;
use std::path::Path;

use crate::pipeline::schema::normalize_column_names;
use crate::utils::{create_spinner, finish_with_success};

fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Load a dataset from a file (CSV or Parquet based on extension).
///
/// Column names are whitespace-trimmed so headers like `" Area"` still match.
pub fn load_dataset(path: &Path, infer_schema_length: usize) -> Result<DataFrame> {
    let extension = file_extension(path);

    // 0 means full table scan
    let schema_length = (infer_schema_length > 0).then_some(infer_schema_length);

    let lf = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(schema_length)
            .finish()
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => anyhow::bail!(
            "Unsupported file format: '{}'. Supported formats: csv, parquet",
            extension
        ),
    };

    let mut df = lf
        .collect()
        .with_context(|| format!("Failed to read {}", path.display()))?;
    normalize_column_names(&mut df)
        .with_context(|| format!("Failed to normalize column names in {}", path.display()))?;
    Ok(df)
}

/// Load a dataset with a spinner, returning the frame and its shape.
pub fn load_dataset_with_progress(
    path: &Path,
    infer_schema_length: usize,
) -> Result<(DataFrame, usize, usize)> {
    let spinner = create_spinner(&format!("Loading {}...", path.display()));
    let df = load_dataset(path, infer_schema_length)?;
    let (rows, cols) = df.shape();
    finish_with_success(&spinner, &format!("Loaded {} rows x {} columns", rows, cols));
    Ok((df, rows, cols))
}

/// Save dataset to file (CSV or Parquet based on extension)
pub fn save_dataset(df: &mut DataFrame, path: &Path) -> Result<()> {
    match file_extension(path).as_str() {
        "csv" => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            CsvWriter::new(&mut file)
                .finish(df)
                .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
        }
        "parquet" => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            ParquetWriter::new(file)
                .finish(df)
                .with_context(|| format!("Failed to write Parquet file: {}", path.display()))?;
        }
        other => anyhow::bail!(
            "Unsupported output format: '{}'. Supported formats: csv, parquet",
            other
        ),
    }

    Ok(())
}

//! Command-line argument definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use crate::pipeline::{DEFAULT_OUTLIER_COLUMNS, DEFAULT_TARGET_COLUMN};

/// Seedsort - classify pumpkin seeds from frozen preprocessing parameters
#[derive(Parser, Debug)]
#[command(name = "seedsort")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fit the preprocessing pipeline and classifier, then write a parameter bundle
    Train(TrainArgs),
    /// Predict the cultivar of a single seed record (JSON)
    Predict(PredictArgs),
    /// Predict every row of a CSV or Parquet file
    Batch(BatchArgs),
    /// Show the frozen parameters stored in a bundle
    Inspect(InspectArgs),
}

/// Classifier trained or imported by `train`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelKind {
    /// Logistic regression fitted by gradient descent
    Linear,
    /// Dense network with weights imported from --network
    NeuralNet,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Training data (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Column holding the cultivar label
    #[arg(short, long, default_value = DEFAULT_TARGET_COLUMN)]
    pub target: String,

    /// Target value that maps to class 1
    #[arg(long, default_value = "Ürgüp Sivrisi")]
    pub event_value: String,

    /// Target value that maps to class 0
    #[arg(long, default_value = "Çerçevelik")]
    pub non_event_value: String,

    /// Where to write the parameter bundle
    #[arg(short, long, default_value = "bundle.json")]
    pub output: PathBuf,

    /// Columns clipped by the IQR outlier clamp (comma-separated).
    /// Defaults to the six size measurements.
    #[arg(long, value_delimiter = ',')]
    pub outlier_columns: Vec<String>,

    /// Correlation threshold - drop the later feature of pairs with |r| above this value
    #[arg(long, default_value = "0.95", value_parser = validate_threshold)]
    pub correlation_threshold: f64,

    /// Classifier to put in the bundle
    #[arg(long, value_enum, default_value_t = ModelKind::Linear)]
    pub model: ModelKind,

    /// Network weights (JSON) for --model neural-net
    #[arg(long)]
    pub network: Option<PathBuf>,

    /// Gradient-descent epochs for the linear model
    #[arg(long, default_value = "2000")]
    pub epochs: usize,

    /// Gradient-descent learning rate for the linear model
    #[arg(long, default_value = "0.1", value_parser = validate_positive)]
    pub learning_rate: f64,

    /// L2 penalty for the linear model
    #[arg(long, default_value = "0.001", value_parser = validate_non_negative)]
    pub l2: f64,

    /// Skip interactive confirmation prompts
    #[arg(long, default_value = "false")]
    pub no_confirm: bool,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

impl TrainArgs {
    /// Outlier columns, falling back to the default size measurements.
    pub fn outlier_columns(&self) -> Vec<String> {
        if self.outlier_columns.is_empty() {
            DEFAULT_OUTLIER_COLUMNS.iter().map(|s| s.to_string()).collect()
        } else {
            self.outlier_columns
                .iter()
                .map(|c| c.trim().to_string())
                .collect()
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Parameter bundle written by `train`
    #[arg(short, long)]
    pub bundle: PathBuf,

    /// Seed record as a JSON object; read from stdin when omitted
    #[arg(short, long)]
    pub record: Option<String>,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Parameter bundle written by `train`
    #[arg(short, long)]
    pub bundle: PathBuf,

    /// Input file (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file (CSV or Parquet, determined by extension).
    /// Defaults to the input directory with a '_predictions' suffix.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of rows to use for schema inference (CSV only)
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

impl BatchArgs {
    /// Get the output path, deriving it from the input if not given.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| derive_output_path(&self.input, "predictions"))
    }
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Parameter bundle to show
    #[arg(short, long)]
    pub bundle: PathBuf,

    /// Print the raw bundle JSON instead of tables
    #[arg(long, default_value = "false")]
    pub json: bool,
}

/// `dir/data.csv` -> `dir/data_<suffix>.csv`
fn derive_output_path(input: &Path, suffix: &str) -> PathBuf {
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let extension = input.extension().and_then(|e| e.to_str()).unwrap_or("csv");
    parent.join(format!("{}_{}.{}", stem, suffix, extension))
}

fn parse_number(s: &str) -> Result<f64, String> {
    s.parse()
        .map_err(|_| format!("'{}' is not a valid number", s))
}

/// Validator for threshold parameters in (0, 1]
fn validate_threshold(s: &str) -> Result<f64, String> {
    let value = parse_number(s)?;
    if value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(format!("threshold must be in (0, 1], got {}", value))
    }
}

fn validate_positive(s: &str) -> Result<f64, String> {
    let value = parse_number(s)?;
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(format!("value must be positive, got {}", value))
    }
}

fn validate_non_negative(s: &str) -> Result<f64, String> {
    let value = parse_number(s)?;
    if value >= 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(format!("value must be zero or positive, got {}", value))
    }
}

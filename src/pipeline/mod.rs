//! Pipeline module - validation, preprocessing stages, and the parameter bundle

pub mod bundle;
pub mod correlation;
pub mod error;
pub mod loader;
pub mod orchestrator;
pub mod outlier;
pub mod prediction;
pub mod scaler;
pub mod schema;
pub mod target;

pub use bundle::{BundleError, ParameterBundle, BUNDLE_FORMAT_VERSION};
pub use correlation::*;
pub use error::{ErrorKind, PipelineError, RangeViolation, Stage};
pub use loader::*;
pub use orchestrator::*;
pub use outlier::*;
pub use prediction::*;
pub use scaler::*;
pub use schema::{
    duplicate_trimmed_names, feature_columns, missing_columns, normalize_column_names,
    records_to_frame, validate_table, FeatureDomain, SeedRecord, DEFAULT_OUTLIER_COLUMNS, FEATURE_COLUMNS,
};
pub use target::*;

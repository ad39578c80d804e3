//! Parameter bundle - the single on-disk artifact used for serving
//!
//! A bundle holds every frozen statistic plus the trained classifier. It is
//! written atomically (temporary file, then rename) and loading either yields a
//! fully consistent bundle or an error naming what is wrong.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::{Classifier, ScoringAdapter};
use crate::pipeline::orchestrator::{FittedPreprocessor, Pipeline, PipelineConfig};
use crate::pipeline::prediction::ClassLabels;

/// Current bundle format version
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// Errors raised while saving or loading a parameter bundle.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("parameter bundle not found at {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read parameter bundle {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write parameter bundle {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt or incomplete parameter bundle {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize parameter bundle: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("unsupported bundle format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("inconsistent parameter bundle: {0}")]
    Inconsistent(String),

    #[error(
        "bundle was fitted on features [{}], expected [{}]",
        .found.join(", "),
        .expected.join(", ")
    )]
    FeatureSetMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// Everything needed to serve predictions without retraining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterBundle {
    pub format_version: u32,
    /// RFC 3339 creation timestamp
    pub created_at: String,
    pub labels: ClassLabels,
    pub config: PipelineConfig,
    pub preprocessor: FittedPreprocessor,
    pub classifier: Classifier,
}

impl ParameterBundle {
    /// Assemble a bundle from freshly fitted parts, checking they belong together.
    pub fn new(
        config: PipelineConfig,
        preprocessor: FittedPreprocessor,
        classifier: Classifier,
        labels: ClassLabels,
    ) -> Result<Self, BundleError> {
        let bundle = Self {
            format_version: BUNDLE_FORMAT_VERSION,
            created_at: chrono::Utc::now().to_rfc3339(),
            labels,
            config,
            preprocessor,
            classifier,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    /// Check version, stage parameter consistency, and classifier input width.
    pub fn validate(&self) -> Result<(), BundleError> {
        if self.format_version != BUNDLE_FORMAT_VERSION {
            return Err(BundleError::UnsupportedVersion {
                found: self.format_version,
                expected: BUNDLE_FORMAT_VERSION,
            });
        }

        if self.preprocessor.feature_columns != self.config.feature_columns {
            return Err(BundleError::Inconsistent(
                "preprocessor and config disagree on the feature columns".to_string(),
            ));
        }

        self.preprocessor
            .check_consistency()
            .map_err(BundleError::Inconsistent)?;

        self.classifier
            .validate()
            .map_err(|e| BundleError::Inconsistent(e.to_string()))?;

        let width = self.preprocessor.output_columns().len();
        if self.classifier.n_features() != width {
            return Err(BundleError::Inconsistent(format!(
                "{} expects {} feature(s) but the preprocessor produces {}",
                self.classifier.name(),
                self.classifier.n_features(),
                width
            )));
        }
        Ok(())
    }

    /// Reject bundles fitted on a different feature-column set.
    pub fn ensure_features(&self, expected: &[String]) -> Result<(), BundleError> {
        if self.preprocessor.feature_columns != expected {
            return Err(BundleError::FeatureSetMismatch {
                expected: expected.to_vec(),
                found: self.preprocessor.feature_columns.clone(),
            });
        }
        Ok(())
    }

    /// Serving-mode pipeline over the frozen parameters.
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::from_fitted(self.config.clone(), self.preprocessor.clone())
    }

    /// Write the bundle as JSON, replacing `path` atomically.
    pub fn save(&self, path: &Path) -> Result<(), BundleError> {
        let json = serde_json::to_vec_pretty(self).map_err(BundleError::Serialize)?;
        let tmp_path = temporary_path(path);
        let write_err = |source| BundleError::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut file = File::create(&tmp_path).map_err(write_err)?;
        file.write_all(&json).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);

        if let Err(source) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(write_err(source));
        }

        tracing::info!(path = %path.display(), "parameter bundle saved");
        Ok(())
    }

    /// Load and validate a bundle. Nothing partial is ever returned.
    pub fn load(path: &Path) -> Result<Self, BundleError> {
        if !path.exists() {
            return Err(BundleError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let bytes = fs::read(path).map_err(|source| BundleError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let bundle: Self = serde_json::from_slice(&bytes).map_err(|source| BundleError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        bundle.validate()?;

        tracing::info!(
            path = %path.display(),
            classifier = bundle.classifier.name(),
            created_at = %bundle.created_at,
            "parameter bundle loaded"
        );
        Ok(bundle)
    }
}

fn temporary_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("bundle.json");
    path.with_file_name(format!(".{name}.tmp"))
}

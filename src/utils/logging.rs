//! Logging setup for the command-line tool.
//!
//! Library code only emits `tracing` events; the binary installs a single
//! stderr subscriber so stdout stays reserved for predictions and reports.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "warn";

static INITIALIZED: OnceLock<()> = OnceLock::new();

/// Errors that may occur while initializing logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Install the global stderr subscriber. Subsequent calls are no-ops.
pub fn init() -> Result<(), LoggingError> {
    if INITIALIZED.get().is_some() {
        return Ok(());
    }

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    let subscriber = Registry::default()
        .with(build_env_filter())
        .with(stderr_layer);
    tracing::subscriber::set_global_default(subscriber)?;
    let _ = INITIALIZED.set(());

    tracing::debug!("logging initialized");
    Ok(())
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

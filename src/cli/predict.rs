//! `predict` and `batch` - serve predictions from a parameter bundle

use std::io::Read;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use console::style;

use crate::cli::args::{BatchArgs, PredictArgs};
use crate::pipeline::{load_dataset_with_progress, save_dataset};
use crate::report::display_predictions;
use crate::service::{ErrorResponse, ServiceContext};
use crate::utils::{create_spinner, finish_with_success, print_step_time, print_success};

fn load_context(bundle: &Path) -> Result<ServiceContext> {
    ServiceContext::load(bundle)
        .with_context(|| format!("Cannot serve predictions from {}", bundle.display()))
}

/// Print the single-record response (or error payload) as JSON on stdout.
pub fn run_predict(args: &PredictArgs) -> Result<()> {
    let context = load_context(&args.bundle)?;

    let record = match &args.record {
        Some(json) => json.clone(),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read the record from stdin")?;
            buf
        }
    };

    match context.predict_json(&record) {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&ErrorResponse::from(&e))?);
            Err(e).context("Prediction request rejected")
        }
    }
}

pub fn run_batch(args: &BatchArgs) -> Result<()> {
    let output_path = args.output_path();

    let spinner = create_spinner(&format!("Loading bundle {}...", args.bundle.display()));
    let context = load_context(&args.bundle)?;
    finish_with_success(
        &spinner,
        &format!("Loaded {}", context.classifier().name()),
    );

    let start = Instant::now();
    let (df, _rows, _cols) = load_dataset_with_progress(&args.input, args.infer_schema_length)?;
    let mut output = context
        .score_table(&df)
        .with_context(|| format!("Failed to score {}", args.input.display()))?;
    print_step_time(start.elapsed());

    display_predictions(&output.predictions, &context.bundle().labels);

    save_dataset(&mut output.table, &output_path)?;
    println!();
    print_success(&format!(
        "Predictions saved to {}",
        style(output_path.display()).cyan()
    ));
    Ok(())
}

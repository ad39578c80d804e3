//! `train` - fit the preprocessor and classifier and write the parameter bundle

use std::time::Instant;

use anyhow::{Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm};

use crate::cli::args::{ModelKind, TrainArgs};
use crate::model::{
    Classifier, LinearModelAdapter, LinearModelConfig, NeuralNetAdapter, ScoringAdapter,
};
use crate::pipeline::{
    encode_target, load_dataset_with_progress, to_matrix, ParameterBundle,
    Pipeline, PipelineConfig, TargetMapping,
};
use crate::report::TrainingSummary;
use crate::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_completion,
    print_config, print_count, print_info, print_step_header, print_step_time, TrainCard,
};

pub fn run_train(args: &TrainArgs) -> Result<()> {
    print_banner(env!("CARGO_PKG_VERSION"));

    if args.output.exists() && !args.no_confirm {
        let overwrite = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "{} already exists. Overwrite it?",
                args.output.display()
            ))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !overwrite {
            print_info("Keeping the existing bundle; nothing was written.");
            return Ok(());
        }
    }

    let model_name = match args.model {
        ModelKind::Linear => "linear model",
        ModelKind::NeuralNet => "neural network",
    };
    let config = PipelineConfig::default()
        .with_outlier_columns(args.outlier_columns())
        .with_correlation_threshold(args.correlation_threshold);
    config.validate().context("Invalid pipeline configuration")?;

    print_config(&TrainCard {
        input: &args.input,
        target: &args.target,
        output: &args.output,
        model: model_name,
        outlier_columns: config.outlier_columns.len(),
        correlation_threshold: config.correlation_threshold,
    });

    // Step 1: Load dataset
    print_step_header(1, "Loading Dataset");
    let load_start = Instant::now();
    let (df, rows, _cols) = load_dataset_with_progress(&args.input, args.infer_schema_length)?;
    print_step_time(load_start.elapsed());

    // Step 2: Encode target
    print_step_header(2, "Encoding Target");
    let mapping = TargetMapping::new(args.event_value.clone(), args.non_event_value.clone());
    let labels = encode_target(&df, &args.target, &mapping)
        .with_context(|| format!("Failed to encode target column '{}'", args.target))?;
    let events = labels.iter().filter(|&&y| y == 1).count();
    print_count(
        &format!("'{}' row(s)", mapping.event_value),
        events,
        Some("(class 1)"),
    );
    print_count(
        &format!("'{}' row(s)", mapping.non_event_value),
        labels.len() - events,
        Some("(class 0)"),
    );

    // Step 3: Fit preprocessing
    print_step_header(3, "Fitting Preprocessor");
    let fit_start = Instant::now();
    let spinner = create_spinner("Clamping outliers, filtering correlations, scaling...");
    let mut pipeline = Pipeline::new(config.clone());
    let prepared = pipeline
        .fit_transform(&df)
        .context("Failed to fit the preprocessing pipeline")?;
    finish_with_success(&spinner, "Preprocessor fitted");

    let clamp_counts = pipeline.clamp_counts().to_vec();
    let fitted = pipeline
        .into_fitted()
        .context("Pipeline holds no parameters after fitting")?;
    print_count(
        "correlated feature(s) to drop",
        fitted.correlation.drop_list().len(),
        Some(format!("(|r| > {})", config.correlation_threshold).as_str()),
    );
    print_step_time(fit_start.elapsed());

    // Step 4: Classifier
    print_step_header(4, "Fitting Classifier");
    let class_start = Instant::now();
    let matrix = to_matrix(&prepared).context("Failed to build the feature matrix")?;
    let classifier = match args.model {
        ModelKind::Linear => {
            let spinner = create_spinner("Running gradient descent...");
            let model_config = LinearModelConfig::default()
                .with_epochs(args.epochs)
                .with_learning_rate(args.learning_rate)
                .with_l2(args.l2);
            let model = LinearModelAdapter::fit(&matrix, &labels, &model_config)
                .context("Failed to fit the linear model")?;
            finish_with_success(&spinner, "Linear model fitted");
            Classifier::Linear(model)
        }
        ModelKind::NeuralNet => {
            let path = args
                .network
                .as_ref()
                .context("--network is required with --model neural-net")?;
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read network weights: {}", path.display()))?;
            let net = NeuralNetAdapter::from_json(&json)
                .with_context(|| format!("Invalid network weights in {}", path.display()))?;
            Classifier::NeuralNet(net)
        }
    };

    let accuracy = training_accuracy(&classifier, &matrix, &labels)?;
    print_step_time(class_start.elapsed());

    // Step 5: Save bundle
    print_step_header(5, "Saving Parameter Bundle");
    let spinner = create_spinner(&format!("Writing {}...", args.output.display()));
    let bundle = ParameterBundle::new(config, fitted, classifier, mapping.class_labels())
        .context("Fitted parameters do not form a consistent bundle")?;
    bundle
        .save(&args.output)
        .with_context(|| format!("Failed to save bundle to {}", args.output.display()))?;
    if accuracy < 0.5 {
        finish_with_warning(&spinner, "Bundle saved, but the classifier does worse than chance");
    } else {
        finish_with_success(&spinner, "Bundle saved");
    }

    let mut summary = TrainingSummary::new(rows, bundle.preprocessor.feature_columns.len());
    summary.clamp_counts = clamp_counts;
    summary.correlated_pairs = bundle.preprocessor.correlation.pairs().to_vec();
    summary.dropped_correlation = bundle.preprocessor.correlation.drop_list().to_vec();
    summary.output_columns = bundle.preprocessor.output_columns();
    summary.classifier = bundle.classifier.name().to_string();
    summary.training_accuracy = Some(accuracy);
    summary.bundle_path = Some(args.output.clone());
    summary.display();

    print_completion("Seedsort training complete!");
    Ok(())
}

/// Share of rows whose predicted class matches the label.
fn training_accuracy(
    classifier: &Classifier,
    matrix: &faer::Mat<f64>,
    labels: &[u8],
) -> Result<f64> {
    let predicted = classifier
        .predict(matrix)
        .with_context(|| format!("{} failed on the training matrix", classifier.name()))?;
    let correct = predicted
        .iter()
        .zip(labels)
        .filter(|(p, y)| p == y)
        .count();
    Ok(correct as f64 / labels.len().max(1) as f64)
}

//! Training summary report

use std::path::PathBuf;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::CorrelatedPair;

/// What a training run fitted and how well the classifier fits its own data.
#[derive(Debug, Default)]
pub struct TrainingSummary {
    pub rows: usize,
    pub input_features: usize,
    pub clamp_counts: Vec<(String, usize)>,
    pub correlated_pairs: Vec<CorrelatedPair>,
    pub dropped_correlation: Vec<String>,
    pub output_columns: Vec<String>,
    pub classifier: String,
    /// Share of training rows predicted correctly
    pub training_accuracy: Option<f64>,
    pub bundle_path: Option<PathBuf>,
}

impl TrainingSummary {
    pub fn new(rows: usize, input_features: usize) -> Self {
        Self {
            rows,
            input_features,
            ..Default::default()
        }
    }

    pub fn total_clamped(&self) -> usize {
        self.clamp_counts.iter().map(|(_, n)| n).sum()
    }

    /// Metric/value table shown after training.
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![Cell::new("📁 Training Rows"), Cell::new(self.rows)]);
        table.add_row(vec![
            Cell::new("🧮 Input Features"),
            Cell::new(self.input_features),
        ]);

        let clamped = self.total_clamped();
        table.add_row(vec![
            Cell::new("✂️  Values Clamped"),
            Cell::new(clamped).fg(if clamped == 0 {
                Color::White
            } else {
                Color::Yellow
            }),
        ]);

        table.add_row(vec![
            Cell::new("🔗 Dropped (Correlation)"),
            Cell::new(self.dropped_correlation.len()).fg(if self.dropped_correlation.is_empty() {
                Color::White
            } else {
                Color::Red
            }),
        ]);

        table.add_row(vec![
            Cell::new("✅ Model Features"),
            Cell::new(self.output_columns.len())
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![Cell::new("🧠 Classifier"), Cell::new(&self.classifier)]);

        if let Some(accuracy) = self.training_accuracy {
            let color = if accuracy >= 0.85 {
                Color::Green
            } else if accuracy >= 0.7 {
                Color::Yellow
            } else {
                Color::Red
            };
            table.add_row(vec![
                Cell::new("🎯 Training Accuracy"),
                Cell::new(format!("{:.2}%", accuracy * 100.0))
                    .fg(color)
                    .add_attribute(Attribute::Bold),
            ]);
        }

        table
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("TRAINING SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        for line in self.to_table().to_string().lines() {
            println!("    {}", line);
        }

        let clamped: Vec<_> = self.clamp_counts.iter().filter(|(_, n)| *n > 0).collect();
        if !clamped.is_empty() {
            println!();
            println!(
                "      {} {}:",
                style("Clamped to training median").yellow(),
                style(format!("({})", clamped.len())).dim()
            );
            for (column, count) in clamped {
                println!("        {} {} ({})", style("•").dim(), column, count);
            }
        }

        if !self.dropped_correlation.is_empty() {
            println!();
            println!(
                "      {} {}:",
                style("High Correlation").yellow(),
                style(format!("({})", self.dropped_correlation.len())).dim()
            );
            for pair in self
                .correlated_pairs
                .iter()
                .filter(|p| self.dropped_correlation.contains(&p.feature2))
            {
                println!(
                    "        {} {} {}",
                    style("•").dim(),
                    pair.feature2,
                    style(format!("(|r| = {:.4} with {})", pair.correlation.abs(), pair.feature1)).dim()
                );
            }
        }

        if let Some(path) = &self.bundle_path {
            println!();
            println!(
                "      {} {}",
                style("Parameter bundle:").dim(),
                style(path.display()).cyan()
            );
        }
    }
}

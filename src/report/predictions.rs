//! Batch prediction report

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::pipeline::{ClassLabels, Prediction};

/// Rows shown in the terminal before the listing is cut short
pub const PREVIEW_ROWS: usize = 20;

/// Number of predictions per cultivar, negative class first.
pub fn class_counts(predictions: &[Prediction], labels: &ClassLabels) -> [(String, usize); 2] {
    let positives = predictions.iter().filter(|p| p.class_id == 1).count();
    [
        (labels.negative.clone(), predictions.len() - positives),
        (labels.positive.clone(), positives),
    ]
}

/// Table of the first `limit` predictions.
pub fn prediction_table(predictions: &[Prediction], limit: usize) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Row").add_attribute(Attribute::Bold),
        Cell::new("Prediction").add_attribute(Attribute::Bold),
        Cell::new("Confidence").add_attribute(Attribute::Bold),
    ]);

    for (row, p) in predictions.iter().enumerate().take(limit) {
        let color = if p.class_id == 1 {
            Color::Magenta
        } else {
            Color::Cyan
        };
        table.add_row(vec![
            Cell::new(row).set_alignment(CellAlignment::Right),
            Cell::new(&p.label).fg(color),
            Cell::new(p.confidence_percent()).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub fn display_predictions(predictions: &[Prediction], labels: &ClassLabels) {
    println!();
    println!(
        "    {} {}",
        style("🌱").green(),
        style("PREDICTIONS").white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
    println!();

    for line in prediction_table(predictions, PREVIEW_ROWS).to_string().lines() {
        println!("    {}", line);
    }
    if predictions.len() > PREVIEW_ROWS {
        println!(
            "    {}",
            style(format!("... {} more row(s)", predictions.len() - PREVIEW_ROWS)).dim()
        );
    }

    println!();
    for (label, count) in class_counts(predictions, labels) {
        println!(
            "      {} {}: {}",
            style("•").dim(),
            label,
            style(count).yellow().bold()
        );
    }
}

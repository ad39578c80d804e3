//! Human-readable view of a parameter bundle's frozen parameters

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Table};
use console::style;

use crate::model::{Activation, Classifier, ScoringAdapter};
use crate::pipeline::ParameterBundle;

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

fn number(value: f64) -> Cell {
    Cell::new(format!("{:.6}", value)).set_alignment(CellAlignment::Right)
}

/// Overview of the bundle metadata.
pub fn metadata_table(bundle: &ParameterBundle) -> Table {
    let mut table = new_table(&["Field", "Value"]);
    table.add_row(vec![
        Cell::new("Format version"),
        Cell::new(bundle.format_version),
    ]);
    table.add_row(vec![Cell::new("Created"), Cell::new(&bundle.created_at)]);
    table.add_row(vec![
        Cell::new("Class 0"),
        Cell::new(&bundle.labels.negative),
    ]);
    table.add_row(vec![
        Cell::new("Class 1"),
        Cell::new(&bundle.labels.positive),
    ]);
    table.add_row(vec![
        Cell::new("Input features"),
        Cell::new(bundle.preprocessor.feature_columns.len()),
    ]);
    table.add_row(vec![
        Cell::new("Correlation threshold"),
        Cell::new(bundle.preprocessor.correlation.threshold()),
    ]);
    table.add_row(vec![
        Cell::new("Classifier"),
        Cell::new(describe_classifier(&bundle.classifier)),
    ]);
    table
}

/// Outlier bounds, one row per clamped column.
pub fn bounds_table(bundle: &ParameterBundle) -> Table {
    let mut table = new_table(&["Column", "Lower", "Upper", "Median"]);
    for b in bundle.preprocessor.outlier.bounds() {
        table.add_row(vec![
            Cell::new(&b.column),
            number(b.lower),
            number(b.upper),
            number(b.median),
        ]);
    }
    table
}

/// Scale parameters in model-input order.
pub fn scaler_table(bundle: &ParameterBundle) -> Table {
    let mut table = new_table(&["Column", "Mean", "Std"]);
    for p in bundle.preprocessor.scaler.parameters() {
        table.add_row(vec![Cell::new(&p.column), number(p.mean), number(p.std)]);
    }
    table
}

pub fn describe_classifier(classifier: &Classifier) -> String {
    match classifier {
        Classifier::Linear(m) => format!("{} ({} weights)", m.name(), m.weights.len()),
        Classifier::NeuralNet(net) => {
            let shape: Vec<String> = net
                .layers
                .iter()
                .map(|l| {
                    let act = match l.activation {
                        Activation::Relu => "relu",
                        Activation::Sigmoid => "sigmoid",
                        Activation::Linear => "linear",
                    };
                    format!("{}:{}", l.outputs(), act)
                })
                .collect();
            format!(
                "{} ({} -> {})",
                net.name(),
                net.n_features(),
                shape.join(" -> ")
            )
        }
    }
}

fn print_section(title: &str, table: &Table) {
    println!();
    println!("    {}", style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

pub fn display_bundle(bundle: &ParameterBundle) {
    print_section("BUNDLE", &metadata_table(bundle));
    print_section("OUTLIER BOUNDS", &bounds_table(bundle));

    println!();
    println!("    {}", style("DROPPED COLUMNS").white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    let dropped = bundle.preprocessor.correlation.drop_list();
    if dropped.is_empty() {
        println!("      {}", style("none").dim());
    }
    for column in dropped {
        println!("      {} {}", style("•").dim(), column);
    }

    print_section("SCALE PARAMETERS", &scaler_table(bundle));
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DenseLayer, LinearModelAdapter, NeuralNetAdapter};

    #[test]
    fn test_describe_linear() {
        let clf = Classifier::Linear(LinearModelAdapter::new(vec![0.1, 0.2, 0.3], 0.0));
        assert_eq!(describe_classifier(&clf), "linear model (3 weights)");
    }

    #[test]
    fn test_describe_network_shape() {
        let net = NeuralNetAdapter::new(vec![
            DenseLayer {
                weights: vec![vec![1.0, 1.0]; 4],
                bias: vec![0.0; 4],
                activation: Activation::Relu,
            },
            DenseLayer {
                weights: vec![vec![1.0; 4]],
                bias: vec![0.0],
                activation: Activation::Sigmoid,
            },
        ])
        .unwrap();
        assert_eq!(
            describe_classifier(&Classifier::NeuralNet(net)),
            "neural network (2 -> 4:relu -> 1:sigmoid)"
        );
    }
}

//! Terminal styling utilities for the command-line tool

use console::{style, Emoji};
use std::path::Path;
use std::time::Duration;

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static TARGET: Emoji<'_, '_> = Emoji("🎯 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static LINK: Emoji<'_, '_> = Emoji("🔗 ", "");
pub static BRAIN: Emoji<'_, '_> = Emoji("🧠 ", "");

/// Print the application banner
pub fn print_banner(version: &str) {
    let banner = r#"
     ___  ___  ___  ___  ___  ___  ___  _____
    / __|| __|| __||   \/ __|/ _ \| _ \|_   _|
    \__ \| _| | _| | |) \__ \ (_) |   /  | |
    |___/|___||___||___/|___/\___/|_|_\  |_|
    "#;

    println!();
    println!("{}", style(banner).cyan().bold());
    println!(
        "    {}",
        style("Pumpkin seed classification, trained once and served frozen").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Settings shown on the training configuration card.
pub struct TrainCard<'a> {
    pub input: &'a Path,
    pub target: &'a str,
    pub output: &'a Path,
    pub model: &'a str,
    pub outlier_columns: usize,
    pub correlation_threshold: f64,
}

/// Print configuration card
pub fn print_config(card: &TrainCard<'_>) {
    let box_width = 56;
    let line = "─".repeat(box_width - 2);

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(box_width - 20)
    );
    println!("    ├{}┤", line);
    println!(
        "    │  {} Input:  {:<39}│",
        FOLDER,
        truncate_path(card.input, 38)
    );
    println!(
        "    │  {} Target: {:<39}│",
        TARGET,
        truncate_string(card.target, 38)
    );
    println!(
        "    │  {} Output: {:<39}│",
        SAVE,
        truncate_path(card.output, 38)
    );
    println!("    ├{}┤", line);
    println!(
        "    │  {} Classifier:            {:<24}│",
        BRAIN,
        style(card.model).yellow()
    );
    println!(
        "    │  {} Clamped columns:       {:<24}│",
        CHART,
        style(card.outlier_columns).yellow()
    );
    println!(
        "    │  {} Correlation threshold: {:<24}│",
        LINK,
        style(format!("{:.2}", card.correlation_threshold)).yellow()
    );
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print how long a step took
pub fn print_step_time(elapsed: Duration) {
    println!(
        "      {}",
        style(format!("done in {:.2}s", elapsed.as_secs_f64())).dim()
    );
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

/// Print the final completion message
pub fn print_completion(message: &str) {
    println!();
    println!("    {} {}", ROCKET, style(message).green().bold());
    println!();
}

/// Print a styled count message
pub fn print_count(description: &str, count: usize, threshold_info: Option<&str>) {
    if let Some(info) = threshold_info {
        println!(
            "      Found {} {} {}",
            style(count).yellow().bold(),
            description,
            style(info).dim()
        );
    } else {
        println!("      Found {} {}", style(count).yellow().bold(), description);
    }
}

// Helper functions

fn truncate_path(path: &Path, max_len: usize) -> String {
    let path_str = path.display().to_string();
    truncate_string(&path_str, max_len)
}

fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_short_strings() {
        assert_eq!(truncate_string("Class", 38), "Class");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let truncated = truncate_string("Ürgüp Sivrisi Ürgüp Sivrisi", 10);
        assert!(truncated.starts_with("..."));
        assert_eq!(truncated.chars().count(), 10);
    }
}

//! Terminal styling for the step-by-step CLI output

use std::path::Path;

use console::{style, Emoji};

use crate::pipeline::ExperimentConfig;

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static TARGET: Emoji<'_, '_> = Emoji("🎯 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static SCALE: Emoji<'_, '_> = Emoji("⚖️  ", "");
pub static DICE: Emoji<'_, '_> = Emoji("🎲 ", "");

const BOX_WIDTH: usize = 56;

pub fn print_banner(version: &str) {
    println!();
    println!(
        "    {} {}",
        style("◆").cyan().bold(),
        style("churnprep").cyan().bold()
    );
    println!(
        "    {}",
        style("Binning, encoding and imbalance handling for churn models").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

fn card_row(icon: &Emoji<'_, '_>, label: &str, value: &str) {
    let text = format!("{}{:<11}{}", icon, label, value);
    println!("    │  {:<width$}│", text, width = BOX_WIDTH - 4);
}

/// Configuration card for a `prepare` run
pub fn print_config(input: &Path, output: &Path, config: &ExperimentConfig) {
    let line = "─".repeat(BOX_WIDTH - 2);

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(BOX_WIDTH - 20)
    );
    println!("    ├{}┤", line);
    card_row(&FOLDER, "Input:", &truncate_path(input, 36));
    card_row(&TARGET, "Target:", &truncate_string(&config.target, 36));
    card_row(&SAVE, "Output:", &truncate_path(output, 36));
    println!("    ├{}┤", line);
    card_row(&ROCKET, "Family:", &config.family.to_string());
    card_row(&SCALE, "Imbalance:", &imbalance_label(config));
    card_row(
        &DICE,
        "Split:",
        &format!(
            "test {:.0}% / val {:.0}% / seed {}",
            config.test_size * 100.0,
            config.val_size * 100.0,
            config.seed
        ),
    );
    println!("    └{}┘", line);
    println!();
}

fn imbalance_label(config: &ExperimentConfig) -> String {
    let resampling = config.resampling_method();
    match config.weighting_method() {
        Some(w) => format!("{} + {} weights (ratio {})", resampling, w, config.cost_ratio),
        None => resampling.to_string(),
    }
}

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

pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

pub fn print_completion(message: &str) {
    println!();
    println!("    {} {}", ROCKET, style(message).green().bold());
    println!();
}

pub fn print_count(description: &str, count: usize, detail: Option<&str>) {
    match detail {
        Some(info) => println!(
            "      Found {} {} {}",
            style(count).yellow().bold(),
            description,
            style(info).dim()
        ),
        None => println!("      Found {} {}", style(count).yellow().bold(), description),
    }
}

fn truncate_path(path: &Path, max_len: usize) -> String {
    truncate_string(&path.display().to_string(), max_len)
}

/// Keep the tail of `s`, prefixed with "...", when it exceeds `max_len` chars.
fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}

//! `evaluate` subcommand: threshold tuning over a file of scored predictions

use anyhow::{Context, Result};
use polars::prelude::DataFrame;

use super::args::EvaluateArgs;
use crate::pipeline::schema::{numeric_values, require_columns};
use crate::pipeline::{
    default_threshold_grid, extract_labels, load_dataset, summarize_thresholds, sweep_thresholds,
};
use crate::report::{display_threshold_summary, display_threshold_table, export_threshold_results};
use crate::utils::progress::{create_spinner, finish_with_success};
use crate::utils::styling::{print_completion, print_step_header, print_success};

pub fn run_evaluate(args: &EvaluateArgs) -> Result<()> {
    print_step_header(1, "Load Predictions");
    let spinner = create_spinner("Loading predictions...");
    let df = load_dataset(&args.predictions)?;
    require_columns(
        &df,
        &[args.label_column.as_str(), args.score_column.as_str()],
        "evaluation",
    )?;
    let labels = extract_labels(&df, &args.label_column)?;
    let scores = read_scores(&df, &args.score_column)?;
    finish_with_success(&spinner, &format!("Loaded {} scored rows", labels.len()));

    print_step_header(2, "Threshold Sweep");
    let grid = threshold_grid(args.threshold);
    let results = sweep_thresholds(&labels, &scores, &grid)?;
    let summary = summarize_thresholds(&results, args.threshold, args.min_recall)?;
    display_threshold_table(&results);
    display_threshold_summary(&summary);

    let output_path = args.output_path();
    let predictions_file = args.predictions.display().to_string();
    export_threshold_results(&predictions_file, &results, &summary, &output_path)?;
    println!();
    print_success(&format!("Threshold results saved to {}", output_path.display()));

    print_completion("churnprep evaluation complete!");
    Ok(())
}

/// The default grid with `threshold` added when it is not already on it.
fn threshold_grid(threshold: f64) -> Vec<f64> {
    let mut grid = default_threshold_grid();
    if !grid.iter().any(|t| (t - threshold).abs() < 1e-9) {
        grid.push(threshold);
        grid.sort_by(f64::total_cmp);
    }
    grid
}

/// Probability column as `f64`; every row must carry a finite score.
fn read_scores(df: &DataFrame, column: &str) -> Result<Vec<f64>> {
    numeric_values(df, column)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.filter(|s| s.is_finite())
                .with_context(|| format!("Column '{}' has no valid score at row {}", column, row))
        })
        .collect()
}

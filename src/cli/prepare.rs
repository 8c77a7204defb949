//! `prepare` subcommand: load, split, preprocess and rebalance a churn dataset

use std::time::Instant;

use anyhow::{Context, Result};
use console::style;
use tracing::info;

use super::args::PrepareArgs;
use crate::pipeline::{
    estimated_memory_mb, label_counts, load_dataset, prepare_experiment, prepare_frame,
};
use crate::report::{
    display_preparation_summary, export_run_metadata, write_experiment_matrices, RunMetadata,
};
use crate::utils::progress::{create_spinner, finish_with_success, finish_with_warning};
use crate::utils::styling::{
    print_banner, print_completion, print_config, print_count, print_info, print_step_header,
    print_success,
};

pub const PREPROCESSOR_FILE: &str = "preprocessor.json";
pub const METADATA_FILE: &str = "metadata.json";

pub fn run_prepare(args: &PrepareArgs) -> Result<()> {
    let config = args.resolve_config()?;
    let output_dir = args.output_dir();
    let start = Instant::now();

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&args.input, &output_dir, &config);

    print_step_header(1, "Load Dataset");
    let spinner = create_spinner("Loading dataset...");
    let df = load_dataset(&args.input)?;
    let (rows, cols) = df.shape();
    finish_with_success(
        &spinner,
        &format!(
            "Loaded {} rows × {} columns ({:.1} MB)",
            rows,
            cols,
            estimated_memory_mb(&df)
        ),
    );

    print_step_header(2, "Validate Schema and Labels");
    let data = prepare_frame(&df, &config)?;
    let (retained, churned) = label_counts(&data.labels);
    print_count("retained customers", retained, None);
    print_count(
        "churned customers",
        churned,
        Some(&format!(
            "({:.1}% churn rate)",
            churned as f64 / data.labels.len().max(1) as f64 * 100.0
        )),
    );

    print_step_header(3, "Split, Bin, Encode and Rebalance");
    let spinner = create_spinner("Fitting preprocessor on the training partition...");
    let experiment = prepare_experiment(&data, &config)?;
    if experiment.train.y.len() == experiment.split_sizes.train {
        finish_with_success(&spinner, "Training partition prepared");
    } else {
        finish_with_warning(
            &spinner,
            &format!(
                "Training partition resampled from {} to {} rows",
                experiment.split_sizes.train,
                experiment.train.y.len()
            ),
        );
    }
    display_preparation_summary(&experiment);

    print_step_header(4, "Save Artifacts");
    std::fs::create_dir_all(&output_dir).with_context(|| {
        format!("Failed to create output directory: {}", output_dir.display())
    })?;

    let preprocessor_path = output_dir.join(PREPROCESSOR_FILE);
    experiment.pipeline.save_json(&preprocessor_path)?;
    print_success(&format!("Preprocessor saved to {}", preprocessor_path.display()));

    let metadata_path = output_dir.join(METADATA_FILE);
    let input_file = args.input.display().to_string();
    export_run_metadata(
        &RunMetadata::new(&input_file, &config, &experiment),
        &metadata_path,
    )?;
    print_success(&format!("Metadata saved to {}", metadata_path.display()));

    let spinner = create_spinner("Writing feature matrices...");
    let written = write_experiment_matrices(&experiment, &output_dir)?;
    finish_with_success(&spinner, &format!("{} matrices written", written.len()));
    for path in &written {
        print_info(&format!("{}", style(path.display()).dim()));
    }

    info!("Preparation finished in {:.2?}", start.elapsed());
    print_completion(&format!(
        "churnprep preparation complete in {:.2}s",
        start.elapsed().as_secs_f64()
    ));
    Ok(())
}

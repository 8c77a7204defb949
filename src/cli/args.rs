//! Command-line argument definitions using clap

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::pipeline::{ExperimentConfig, ModelFamily};

/// churnprep - Feature binning, encoding and imbalance handling for churn models
#[derive(Parser, Debug)]
#[command(name = "churnprep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging on stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true, default_value = "false")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split, bin, encode and rebalance a churn dataset, writing model-ready matrices
    Prepare(PrepareArgs),

    /// Score a predictions file across decision thresholds
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Input file path (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory for the fitted preprocessor, metadata and matrices.
    /// Defaults to '<input stem>_prepared' next to the input file.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// JSON experiment config. Flags given on the command line override it.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Target column name
    #[arg(short, long)]
    pub target: Option<String>,

    /// Model family: "linear" (one-hot features) or "tree" (ordinal codes)
    #[arg(short, long)]
    pub family: Option<ModelFamily>,

    /// Resampling strategy: none, smote, adasyn, smote_tomek, smote_enn
    #[arg(short, long)]
    pub resampling: Option<String>,

    /// Sample weighting: none, cost_ratio, balanced
    #[arg(short, long)]
    pub weighting: Option<String>,

    /// Weight of a churned sample relative to a retained one
    #[arg(long, value_parser = validate_positive)]
    pub cost_ratio: Option<f64>,

    /// Fraction of rows held out for testing
    #[arg(long, value_parser = validate_fraction)]
    pub test_size: Option<f64>,

    /// Fraction of rows held out for validation
    #[arg(long, value_parser = validate_fraction)]
    pub val_size: Option<f64>,

    /// Random seed for splitting and resampling
    #[arg(long)]
    pub seed: Option<u64>,
}

impl PrepareArgs {
    /// Defaults, then the config file, then explicit flags.
    pub fn resolve_config(&self) -> Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::from_json_file(path)?,
            None => ExperimentConfig::default(),
        };

        if let Some(target) = &self.target {
            config.target = target.clone();
        }
        if let Some(family) = self.family {
            config.family = family;
        }
        if let Some(resampling) = &self.resampling {
            config.resampling = resampling.clone();
        }
        if let Some(weighting) = &self.weighting {
            config.weighting = weighting.clone();
        }
        if let Some(ratio) = self.cost_ratio {
            config.cost_ratio = ratio;
        }
        if let Some(test_size) = self.test_size {
            config.test_size = test_size;
        }
        if let Some(val_size) = self.val_size {
            config.val_size = val_size;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| derived_path(&self.input, "_prepared"))
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Predictions file (CSV or Parquet) with a label and a score column
    #[arg(short, long)]
    pub predictions: PathBuf,

    /// Column holding the true 0/1 label
    #[arg(long, default_value = "label")]
    pub label_column: String,

    /// Column holding the predicted churn probability
    #[arg(long, default_value = "score")]
    pub score_column: String,

    /// Default decision threshold
    #[arg(long, default_value = "0.5", value_parser = validate_unit_interval)]
    pub threshold: f64,

    /// Recall target for the precision-at-recall operating point
    #[arg(long, default_value = "0.7", value_parser = validate_unit_interval)]
    pub min_recall: f64,

    /// JSON output path. Defaults to '<predictions stem>_thresholds.json'.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl EvaluateArgs {
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| derived_path(&self.predictions, "_thresholds.json"))
    }
}

/// Sibling of `input` named after its stem plus `suffix`.
fn derived_path(input: &Path, suffix: &str) -> PathBuf {
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    parent.join(format!("{}{}", stem, suffix))
}

fn parse_number(s: &str) -> std::result::Result<f64, String> {
    s.parse()
        .map_err(|_| format!("'{}' is not a valid number", s))
}

/// Validator for strictly positive, finite values
fn validate_positive(s: &str) -> std::result::Result<f64, String> {
    let value = parse_number(s)?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("value must be a positive number, got {}", value))
    }
}

/// Validator for split fractions in (0, 1)
fn validate_fraction(s: &str) -> std::result::Result<f64, String> {
    let value = parse_number(s)?;
    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!("fraction must be between 0.0 and 1.0 (exclusive), got {}", value))
    }
}

/// Validator for thresholds and recall targets in [0, 1]
fn validate_unit_interval(s: &str) -> std::result::Result<f64, String> {
    let value = parse_number(s)?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("value must be between 0.0 and 1.0, got {}", value))
    }
}

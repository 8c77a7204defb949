//! Dataset loading for CSV and Parquet files

use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::{debug, info};

use super::config::ExperimentConfig;
use super::error::{PrepError, Result as PrepResult};
use super::schema::require_columns;
use super::target::extract_labels;

/// Modeling frame with its labels split off
#[derive(Debug, Clone)]
pub struct PreparedFrame {
    /// Feature columns only; identifiers and the label column are removed
    pub frame: DataFrame,
    pub labels: Vec<i32>,
}

/// Load a dataset from a file (CSV or Parquet based on extension)
pub fn load_dataset(path: &Path) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let lf = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_has_header(true)
            .finish()
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            extension
        ),
    };

    let df = lf
        .collect()
        .with_context(|| format!("Failed to read {}", path.display()))?;
    info!("Loaded {} with shape {:?}", path.display(), df.shape());
    Ok(df)
}

/// Estimated in-memory size of a frame in megabytes
pub fn estimated_memory_mb(df: &DataFrame) -> f64 {
    df.estimated_size() as f64 / (1024.0 * 1024.0)
}

/// Drop identifier columns, validate the modeling schema and extract labels.
pub fn prepare_frame(df: &DataFrame, config: &ExperimentConfig) -> PrepResult<PreparedFrame> {
    let mut required: Vec<&str> = config.modeling_columns();
    required.push(config.target.as_str());
    require_columns(df, &required, "data preparation")?;

    let labels = extract_labels(df, &config.target)?;

    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let to_drop: Vec<&str> = config
        .identifier_columns
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(config.target.as_str()))
        .filter(|c| present.iter().any(|p| p == c))
        .collect();
    debug!("Dropping non-feature columns: {:?}", to_drop);

    let frame = df.drop_many(to_drop);
    if frame.height() != labels.len() {
        return Err(PrepError::invalid_parameter(
            "labels",
            "label count does not match row count",
        ));
    }

    Ok(PreparedFrame { frame, labels })
}

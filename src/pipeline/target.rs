//! Binary label extraction
//!
//! The churn label must be present and exactly 0 or 1 for every record used in
//! an experiment. Numeric, boolean and "0"/"1" string columns are accepted.

use polars::prelude::*;
use tracing::info;

use super::error::{PrepError, Result};

/// Tolerance for floating point comparison when checking binary 0/1 values
const TOLERANCE: f64 = 1e-9;

/// Read `target` as binary labels.
///
/// # Arguments
/// * `df` - Reference to the DataFrame
/// * `target` - Name of the label column
///
/// # Returns
/// * `Ok(Vec<i32>)` - One label per row
/// * `Err` - `Schema` if the column is absent, `InvalidLabel` naming the first
///   null or non-binary row
pub fn extract_labels(df: &DataFrame, target: &str) -> Result<Vec<i32>> {
    let column = df
        .column(target)
        .map_err(|_| PrepError::missing_columns("label extraction", [target]))?;

    let values: Vec<Option<f64>> = match column.dtype() {
        DataType::Boolean => column
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| if b { 1.0 } else { 0.0 }))
            .collect(),
        DataType::String => column
            .str()?
            .into_iter()
            .map(|v| v.and_then(|s| s.trim().parse::<f64>().ok()))
            .collect(),
        _ => column.cast(&DataType::Float64)?.f64()?.into_iter().collect(),
    };

    let raw = if column.dtype() == &DataType::String {
        Some(column.str()?)
    } else {
        None
    };

    let mut labels = Vec::with_capacity(values.len());
    for (row, value) in values.iter().enumerate() {
        match value {
            Some(v) if (v - 0.0).abs() < TOLERANCE => labels.push(0),
            Some(v) if (v - 1.0).abs() < TOLERANCE => labels.push(1),
            other => {
                let shown = match (other, raw) {
                    (_, Some(ca)) => ca.get(row).map_or("null".to_string(), |s| format!("'{}'", s)),
                    (Some(v), None) => v.to_string(),
                    (None, None) => "null".to_string(),
                };
                return Err(PrepError::InvalidLabel {
                    column: target.to_string(),
                    row,
                    value: shown,
                });
            }
        }
    }

    let (negatives, positives) = label_counts(&labels);
    info!(
        "Labels '{}': {} negative, {} positive ({:.2}% positive)",
        target,
        negatives,
        positives,
        if labels.is_empty() {
            0.0
        } else {
            positives as f64 / labels.len() as f64 * 100.0
        }
    );

    Ok(labels)
}

/// Count (negatives, positives) in binary labels.
pub fn label_counts(labels: &[i32]) -> (usize, usize) {
    let positives = labels.iter().filter(|&&l| l == 1).count();
    (labels.len() - positives, positives)
}

//! Artifact export: run metadata, prepared matrices and threshold results

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use ndarray::Array2;
use polars::prelude::*;
use serde::Serialize;

use crate::pipeline::{
    ClassificationMetrics, ExperimentConfig, FeatureMatrix, PreparedExperiment, SplitSizes,
    ThresholdSummary,
};

/// Column holding the class label in exported matrices
pub const LABEL_COLUMN: &str = "label";

/// Column holding the sample weight in exported matrices
pub const WEIGHT_COLUMN: &str = "sample_weight";

/// Metadata about a preparation run
#[derive(Serialize)]
pub struct RunMetadata {
    /// Timestamp of the run (ISO 8601 format)
    pub timestamp: String,
    pub churnprep_version: String,
    pub input_file: String,
    pub config: ExperimentConfig,
    pub split_sizes: SplitSizes,
    pub feature_names: Vec<String>,
    /// Training rows after resampling
    pub resampled_train_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_pos_weight: Option<f64>,
}

impl RunMetadata {
    pub fn new(input_file: &str, config: &ExperimentConfig, experiment: &PreparedExperiment) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            churnprep_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: input_file.to_string(),
            config: config.clone(),
            split_sizes: experiment.split_sizes,
            feature_names: experiment.feature_names.clone(),
            resampled_train_rows: experiment.train.y.len(),
            scale_pos_weight: experiment.scale_pos_weight,
        }
    }
}

/// Write run metadata as pretty JSON.
pub fn export_run_metadata(metadata: &RunMetadata, output_path: &Path) -> Result<()> {
    let json =
        serde_json::to_string_pretty(metadata).context("Failed to serialize run metadata to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write run metadata to {}", output_path.display()))?;

    Ok(())
}

/// Write a feature matrix to CSV with a trailing label column and, when
/// given, a sample-weight column.
pub fn write_matrix_csv(
    output_path: &Path,
    feature_names: &[String],
    x: &Array2<f64>,
    y: &[i32],
    weights: Option<&[f64]>,
) -> Result<()> {
    if y.len() != x.nrows() {
        anyhow::bail!(
            "Label count {} does not match matrix rows {}",
            y.len(),
            x.nrows()
        );
    }

    let matrix = FeatureMatrix::new(feature_names.to_vec(), x.clone())?;
    let mut df = matrix.to_dataframe()?;
    df.with_column(Column::new(LABEL_COLUMN.into(), y.to_vec()))?;
    if let Some(w) = weights {
        df.with_column(Column::new(WEIGHT_COLUMN.into(), w.to_vec()))?;
    }

    let mut file = File::create(output_path)
        .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;
    CsvWriter::new(&mut file)
        .finish(&mut df)
        .with_context(|| format!("Failed to write CSV: {}", output_path.display()))?;

    Ok(())
}

/// Write the train, validation and test matrices of an experiment into
/// `output_dir`, returning the paths written.
pub fn write_experiment_matrices(
    experiment: &PreparedExperiment,
    output_dir: &Path,
) -> Result<Vec<std::path::PathBuf>> {
    let names = &experiment.feature_names;
    let train_path = output_dir.join("train.csv");
    let val_path = output_dir.join("validation.csv");
    let test_path = output_dir.join("test.csv");

    write_matrix_csv(
        &train_path,
        names,
        &experiment.train.x,
        &experiment.train.y,
        experiment.train.weights.as_deref(),
    )?;
    write_matrix_csv(
        &val_path,
        names,
        &experiment.validation.x,
        &experiment.validation.y,
        None,
    )?;
    write_matrix_csv(&test_path, names, &experiment.test.x, &experiment.test.y, None)?;

    Ok(vec![train_path, val_path, test_path])
}

/// Threshold sweep and summary for a scored prediction file
#[derive(Serialize)]
pub struct EvaluationExport<'a> {
    pub timestamp: String,
    pub churnprep_version: String,
    pub predictions_file: &'a str,
    pub summary: &'a ThresholdSummary,
    pub thresholds: &'a [ClassificationMetrics],
}

pub fn export_threshold_results(
    predictions_file: &str,
    results: &[ClassificationMetrics],
    summary: &ThresholdSummary,
    output_path: &Path,
) -> Result<()> {
    let export = EvaluationExport {
        timestamp: Utc::now().to_rfc3339(),
        churnprep_version: env!("CARGO_PKG_VERSION").to_string(),
        predictions_file,
        summary,
        thresholds: results,
    };

    let json = serde_json::to_string_pretty(&export)
        .context("Failed to serialize threshold results to JSON")?;

    std::fs::write(output_path, json).with_context(|| {
        format!(
            "Failed to write threshold results to {}",
            output_path.display()
        )
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_write_matrix_csv_appends_label_and_weight() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.csv");
        let names = vec!["a".to_string(), "b".to_string()];
        let x = array![[1.0, 0.0], [0.0, 1.0]];

        write_matrix_csv(&path, &names, &x, &[0, 1], Some(&[1.0, 10.0])).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("a,b,label,sample_weight"));
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn test_write_matrix_csv_rejects_label_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let names = vec!["a".to_string()];
        let x = array![[1.0], [2.0]];
        assert!(write_matrix_csv(&dir.path().join("m.csv"), &names, &x, &[0], None).is_err());
    }
}

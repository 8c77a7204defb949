//! Experiment configuration
//!
//! Defaults match the churn experiments; a JSON file can override any subset
//! of fields, and CLI flags override the file.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::error::{PrepError, Result};
use super::preprocess::ModelFamily;
use super::resampling::ResamplingMethod;
use super::schema::{
    AGE, BALANCE, CATEGORICAL_COLUMNS, CREDIT_SCORE, IDENTIFIER_COLUMNS, PASSTHROUGH_COLUMNS,
    TARGET, TENURE,
};
use super::split::{DEFAULT_TEST_FRACTION, DEFAULT_VAL_FRACTION};
use super::weights::{WeightingMethod, DEFAULT_COST_RATIO};

/// Default random seed
pub const DEFAULT_SEED: u64 = 42;

/// Default decision threshold
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Default recall target for precision-at-recall threshold selection
pub const DEFAULT_MIN_RECALL: f64 = 0.70;

/// Cost ratios evaluated by the sweep
pub const DEFAULT_COST_RATIOS: [f64; 4] = [5.0, 10.0, 15.0, 20.0];

/// Folds used when cross-validating on the training partition
pub const DEFAULT_CV_FOLDS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Binary label column
    pub target: String,
    /// Columns dropped before modeling
    pub identifier_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub numeric_columns: Vec<String>,
    pub test_size: f64,
    pub val_size: f64,
    pub seed: u64,
    pub family: ModelFamily,
    /// Resampling strategy name; unknown names resolve to "none"
    pub resampling: String,
    /// "none", "cost_ratio" or "balanced"
    pub weighting: String,
    pub cost_ratio: f64,
    pub threshold: f64,
    pub min_recall: f64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        let mut numeric_columns: Vec<String> = [CREDIT_SCORE, AGE, TENURE, BALANCE]
            .iter()
            .map(|s| s.to_string())
            .collect();
        numeric_columns.extend(PASSTHROUGH_COLUMNS.iter().map(|s| s.to_string()));

        Self {
            target: TARGET.to_string(),
            identifier_columns: IDENTIFIER_COLUMNS.iter().map(|s| s.to_string()).collect(),
            categorical_columns: CATEGORICAL_COLUMNS.iter().map(|s| s.to_string()).collect(),
            numeric_columns,
            test_size: DEFAULT_TEST_FRACTION,
            val_size: DEFAULT_VAL_FRACTION,
            seed: DEFAULT_SEED,
            family: ModelFamily::default(),
            resampling: ResamplingMethod::None.name().to_string(),
            weighting: "none".to_string(),
            cost_ratio: DEFAULT_COST_RATIO,
            threshold: DEFAULT_THRESHOLD,
            min_recall: DEFAULT_MIN_RECALL,
        }
    }
}

impl ExperimentConfig {
    /// Load a JSON config file; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Numeric then categorical modeling columns.
    pub fn modeling_columns(&self) -> Vec<&str> {
        self.numeric_columns
            .iter()
            .chain(&self.categorical_columns)
            .map(String::as_str)
            .collect()
    }

    /// Numeric modeling columns that are not binned.
    pub fn passthrough_columns(&self) -> Vec<String> {
        self.numeric_columns
            .iter()
            .filter(|c| ![AGE, CREDIT_SCORE, TENURE, BALANCE].contains(&c.as_str()))
            .cloned()
            .collect()
    }

    pub fn resampling_method(&self) -> ResamplingMethod {
        ResamplingMethod::from_name(&self.resampling)
    }

    /// Weighting method, or `None` when weights are disabled.
    pub fn weighting_method(&self) -> Option<WeightingMethod> {
        match self.weighting.trim().to_lowercase().as_str() {
            "" | "none" => None,
            other => Some(WeightingMethod::from_name(other)),
        }
    }

    /// Check numeric ranges before any data is touched.
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PrepError::invalid_parameter(
                "test_size",
                format!("must be in (0, 1), got {}", self.test_size),
            ));
        }
        if !(self.val_size > 0.0) || self.test_size + self.val_size >= 1.0 {
            return Err(PrepError::invalid_parameter(
                "val_size",
                format!(
                    "must be positive and leave room for training data, got {}",
                    self.val_size
                ),
            ));
        }
        if !self.cost_ratio.is_finite() || self.cost_ratio <= 0.0 {
            return Err(PrepError::invalid_parameter(
                "cost_ratio",
                format!("must be a positive finite number, got {}", self.cost_ratio),
            ));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(PrepError::invalid_parameter(
                "threshold",
                format!("must be in [0, 1], got {}", self.threshold),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_recall) {
            return Err(PrepError::invalid_parameter(
                "min_recall",
                format!("must be in [0, 1], got {}", self.min_recall),
            ));
        }
        Ok(())
    }
}

//! Cost-sensitive sample weights
//!
//! Weights are computed for the training partition only and handed to model
//! training alongside the labels. They are independent of resampling: nothing
//! here prevents combining both.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::{PrepError, Result};

/// Default weight of the positive (churn) class relative to the negative class
pub const DEFAULT_COST_RATIO: f64 = 10.0;

/// Number of classes assumed by the balanced formula
const N_CLASSES: f64 = 2.0;

/// How per-sample weights are derived from labels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingMethod {
    /// Positive samples weigh `cost_ratio`, negatives weigh 1.0
    #[default]
    CostRatio,
    /// `n / (2 * count(class))` for every sample of a class
    Balanced,
}

impl WeightingMethod {
    pub fn name(&self) -> &'static str {
        match self {
            WeightingMethod::CostRatio => "cost_ratio",
            WeightingMethod::Balanced => "balanced",
        }
    }

    /// Resolve a method name case-insensitively. Unknown names fall back to
    /// [`WeightingMethod::CostRatio`] with a warning.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "cost_ratio" => WeightingMethod::CostRatio,
            "balanced" => WeightingMethod::Balanced,
            _ => {
                warn!("Unknown weighting method '{}'. Using 'cost_ratio' instead", name);
                WeightingMethod::CostRatio
            }
        }
    }
}

impl fmt::Display for WeightingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Compute one weight per label.
///
/// # Arguments
/// * `labels` - Binary training labels (0 = retained, 1 = churned)
/// * `method` - Weighting method
/// * `cost_ratio` - Positive-class weight, used by [`WeightingMethod::CostRatio`]
///
/// # Returns
/// * `Ok(Vec<f64>)` - Weights parallel to `labels`
/// * `Err` - If a label is not 0/1 or `cost_ratio` is not a positive finite number
pub fn sample_weights(labels: &[i32], method: WeightingMethod, cost_ratio: f64) -> Result<Vec<f64>> {
    if let Some((row, &value)) = labels.iter().enumerate().find(|(_, &l)| l != 0 && l != 1) {
        return Err(PrepError::InvalidLabel {
            column: "labels".to_string(),
            row,
            value: value.to_string(),
        });
    }

    let weights = match method {
        WeightingMethod::CostRatio => cost_ratio_weights(labels, cost_ratio)?,
        WeightingMethod::Balanced => balanced_weights(labels),
    };

    let total = total_weight(&weights);
    info!(
        "Sample weights ({}): total {:.2}, average {:.4}",
        method,
        total,
        if weights.is_empty() { 0.0 } else { total / weights.len() as f64 }
    );
    Ok(weights)
}

fn cost_ratio_weights(labels: &[i32], cost_ratio: f64) -> Result<Vec<f64>> {
    if !cost_ratio.is_finite() || cost_ratio <= 0.0 {
        return Err(PrepError::invalid_parameter(
            "cost_ratio",
            format!("must be a positive finite number, got {}", cost_ratio),
        ));
    }
    info!("Churn (1) weight = {}, not churn (0) weight = 1.0", cost_ratio);
    Ok(labels
        .iter()
        .map(|&l| if l == 1 { cost_ratio } else { 1.0 })
        .collect())
}

fn balanced_weights(labels: &[i32]) -> Vec<f64> {
    let n = labels.len() as f64;
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for &l in labels {
        *counts.entry(l).or_insert(0) += 1;
    }

    let class_weights: BTreeMap<i32, f64> = counts
        .iter()
        .map(|(&class, &count)| (class, n / (N_CLASSES * count as f64)))
        .collect();
    info!(
        "Class distribution {:?}; balanced weights {:?}",
        counts, class_weights
    );

    labels.iter().map(|l| class_weights[l]).collect()
}

/// Calculate the total weight (sum of all weights).
#[inline]
pub fn total_weight(weights: &[f64]) -> f64 {
    weights.iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_ratio_weights() {
        let weights = sample_weights(&[0, 0, 1, 0, 1], WeightingMethod::CostRatio, 10.0).unwrap();
        assert_eq!(weights, vec![1.0, 1.0, 10.0, 1.0, 10.0]);
    }

    #[test]
    fn test_balanced_weights() {
        let mut labels = vec![0; 800];
        labels.extend(vec![1; 200]);
        let weights = sample_weights(&labels, WeightingMethod::Balanced, 10.0).unwrap();
        assert!((weights[0] - 0.625).abs() < 1e-12);
        assert!((weights[999] - 2.5).abs() < 1e-12);
        assert!((total_weight(&weights) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_method_uses_cost_ratio() {
        let method = WeightingMethod::from_name("focal");
        assert_eq!(method, WeightingMethod::CostRatio);
        let weights = sample_weights(&[1, 0], method, 5.0).unwrap();
        assert_eq!(weights, vec![5.0, 1.0]);
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        for ratio in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = sample_weights(&[0, 1], WeightingMethod::CostRatio, ratio).unwrap_err();
            assert!(matches!(err, PrepError::InvalidParameter { .. }));
        }
    }

    #[test]
    fn test_non_binary_label_rejected() {
        let err = sample_weights(&[0, 2, 1], WeightingMethod::Balanced, 1.0).unwrap_err();
        match err {
            PrepError::InvalidLabel { row, value, .. } => {
                assert_eq!(row, 1);
                assert_eq!(value, "2");
            }
            other => panic!("expected invalid label, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_labels() {
        assert!(sample_weights(&[], WeightingMethod::Balanced, 1.0).unwrap().is_empty());
    }

    #[test]
    fn test_total_weight() {
        let weights = vec![1.0, 2.0, 0.5, 1.5];
        assert!((total_weight(&weights) - 5.0).abs() < 1e-10);
    }
}

//! Classification metrics and decision-threshold tuning
//!
//! Metrics follow the usual zero-division convention: a precision, recall or
//! F1 whose denominator is zero is reported as 0.0.

use serde::Serialize;
use tracing::{debug, info};

use super::error::{PrepError, Result};

// =============================================================================
// Metrics at a single threshold
// =============================================================================

/// Binary confusion matrix counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_positives: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(y_true: &[i32], y_pred: &[i32]) -> Self {
        let mut cm = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t == 1, p == 1) {
                (false, false) => cm.true_negatives += 1,
                (false, true) => cm.false_positives += 1,
                (true, false) => cm.false_negatives += 1,
                (true, true) => cm.true_positives += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.true_negatives + self.false_positives + self.false_negatives + self.true_positives
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> f64 {
        ratio(
            2 * self.true_positives,
            2 * self.true_positives + self.false_positives + self.false_negatives,
        )
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Metrics of a probabilistic classifier at one decision threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationMetrics {
    pub threshold: f64,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Threshold-independent ranking quality
    pub roc_auc: f64,
    pub confusion: ConfusionMatrix,
}

/// Hard predictions: 1 where `proba >= threshold`.
pub fn predict_at_threshold(probas: &[f64], threshold: f64) -> Vec<i32> {
    probas.iter().map(|&p| (p >= threshold) as i32).collect()
}

fn check_inputs(y_true: &[i32], probas: &[f64]) -> Result<()> {
    if y_true.len() != probas.len() {
        return Err(PrepError::invalid_parameter(
            "probabilities",
            format!("{} scores for {} labels", probas.len(), y_true.len()),
        ));
    }
    if let Some(row) = probas.iter().position(|p| p.is_nan()) {
        return Err(PrepError::invalid_parameter(
            "probabilities",
            format!("NaN score at row {}", row),
        ));
    }
    Ok(())
}

/// Compute accuracy, precision, recall, F1 and ROC-AUC at `threshold`.
pub fn calculate_metrics(
    y_true: &[i32],
    probas: &[f64],
    threshold: f64,
) -> Result<ClassificationMetrics> {
    check_inputs(y_true, probas)?;
    Ok(metrics_with_auc(y_true, probas, threshold, roc_auc(y_true, probas)))
}

fn metrics_with_auc(y_true: &[i32], probas: &[f64], threshold: f64, auc: f64) -> ClassificationMetrics {
    let cm = ConfusionMatrix::from_predictions(y_true, &predict_at_threshold(probas, threshold));
    ClassificationMetrics {
        threshold,
        accuracy: cm.accuracy(),
        precision: cm.precision(),
        recall: cm.recall(),
        f1: cm.f1(),
        roc_auc: auc,
        confusion: cm,
    }
}

// =============================================================================
// ROC-AUC
// =============================================================================

/// ROC-AUC from the Mann-Whitney U statistic, with tied scores sharing their
/// average rank. Returns 0.5 when only one class is present.
pub fn roc_auc(y_true: &[i32], scores: &[f64]) -> f64 {
    let mut ranked: Vec<(f64, bool)> = scores
        .iter()
        .zip(y_true)
        .map(|(&s, &t)| (s, t == 1))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n_pos = ranked.iter().filter(|(_, positive)| *positive).count();
    let n_neg = ranked.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut pos_rank_sum = 0.0;
    let mut seen = 0usize;
    for group in ranked.chunk_by(|a, b| a.0 == b.0) {
        // 1-based ranks seen+1 ..= seen+len share their mean
        let mean_rank = seen as f64 + (group.len() as f64 + 1.0) / 2.0;
        let positives = group.iter().filter(|(_, positive)| *positive).count();
        pos_rank_sum += mean_rank * positives as f64;
        seen += group.len();
    }

    let u = pos_rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0;
    u / (n_pos as f64 * n_neg as f64)
}

// =============================================================================
// Threshold sweep
// =============================================================================

/// Thresholds 0.10, 0.15, ..., 0.95
pub fn default_threshold_grid() -> Vec<f64> {
    (10..=95).step_by(5).map(|t| t as f64 / 100.0).collect()
}

/// Metrics at every threshold in `thresholds`, in the given order.
pub fn sweep_thresholds(
    y_true: &[i32],
    probas: &[f64],
    thresholds: &[f64],
) -> Result<Vec<ClassificationMetrics>> {
    check_inputs(y_true, probas)?;
    let auc = roc_auc(y_true, probas);
    let results: Vec<ClassificationMetrics> = thresholds
        .iter()
        .map(|&t| metrics_with_auc(y_true, probas, t, auc))
        .collect();
    debug!("Evaluated {} thresholds", results.len());
    Ok(results)
}

/// Notable operating points picked from a threshold sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdSummary {
    /// Threshold closest to the default cutoff
    pub default: ClassificationMetrics,
    pub best_f1: ClassificationMetrics,
    pub best_recall: ClassificationMetrics,
    /// Highest precision among thresholds with recall >= `min_recall`
    pub precision_at_recall: Option<ClassificationMetrics>,
    pub min_recall: f64,
}

/// First entry maximising `key`.
fn first_max_by(
    results: &[ClassificationMetrics],
    key: impl Fn(&ClassificationMetrics) -> f64,
) -> Option<ClassificationMetrics> {
    let mut best: Option<ClassificationMetrics> = None;
    for m in results {
        if best.map_or(true, |b| key(m) > key(&b)) {
            best = Some(*m);
        }
    }
    best
}

/// Pick the default, best-F1, best-recall and precision-at-recall thresholds.
pub fn summarize_thresholds(
    results: &[ClassificationMetrics],
    default_threshold: f64,
    min_recall: f64,
) -> Result<ThresholdSummary> {
    let empty = || PrepError::invalid_parameter("thresholds", "threshold sweep is empty");

    let default = first_max_by(results, |m| -(m.threshold - default_threshold).abs()).ok_or_else(empty)?;
    let best_f1 = first_max_by(results, |m| m.f1).ok_or_else(empty)?;
    let best_recall = first_max_by(results, |m| m.recall).ok_or_else(empty)?;

    let eligible: Vec<ClassificationMetrics> = results
        .iter()
        .filter(|m| m.recall >= min_recall)
        .copied()
        .collect();
    let precision_at_recall = first_max_by(&eligible, |m| m.precision);

    info!(
        "Best F1 {:.4} at threshold {:.2}; best recall {:.4} at threshold {:.2}",
        best_f1.f1, best_f1.threshold, best_recall.recall, best_recall.threshold
    );
    match &precision_at_recall {
        Some(m) => info!(
            "Recall >= {:.2}: best precision {:.4} at threshold {:.2}",
            min_recall, m.precision, m.threshold
        ),
        None => info!("No threshold reaches recall {:.2}", min_recall),
    }

    Ok(ThresholdSummary {
        default,
        best_f1,
        best_recall,
        precision_at_recall,
        min_recall,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confusion_matrix_metrics() {
        let y = [1, 1, 0, 0, 1];
        let pred = [1, 0, 0, 1, 1];
        let cm = ConfusionMatrix::from_predictions(&y, &pred);
        assert_eq!(cm.true_positives, 2);
        assert_eq!(cm.false_negatives, 1);
        assert_eq!(cm.false_positives, 1);
        assert_eq!(cm.true_negatives, 1);
        assert!((cm.accuracy() - 0.6).abs() < 1e-12);
        assert!((cm.precision() - 2.0 / 3.0).abs() < 1e-12);
        assert!((cm.recall() - 2.0 / 3.0).abs() < 1e-12);
        assert!((cm.f1() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_division_is_zero() {
        let cm = ConfusionMatrix::from_predictions(&[0, 0], &[0, 0]);
        assert_eq!(cm.precision(), 0.0);
        assert_eq!(cm.recall(), 0.0);
        assert_eq!(cm.f1(), 0.0);
        assert_eq!(cm.accuracy(), 1.0);
    }

    #[test]
    fn test_auc_perfect_and_inverted() {
        let y = [0, 0, 1, 1];
        assert!((roc_auc(&y, &[0.1, 0.2, 0.8, 0.9]) - 1.0).abs() < 1e-12);
        assert!(roc_auc(&y, &[0.9, 0.8, 0.2, 0.1]).abs() < 1e-12);
    }

    #[test]
    fn test_auc_with_ties() {
        // One positive/negative pair tied, three ordered correctly
        let y = [0, 1, 0, 1];
        let s = [0.1, 0.5, 0.5, 0.9];
        assert!((roc_auc(&y, &s) - 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_auc_single_class() {
        assert_eq!(roc_auc(&[1, 1], &[0.2, 0.4]), 0.5);
    }

    #[test]
    fn test_threshold_grid() {
        let grid = default_threshold_grid();
        assert_eq!(grid.len(), 18);
        assert_eq!(grid[0], 0.10);
        assert_eq!(grid[17], 0.95);
    }

    #[test]
    fn test_summary_picks_operating_points() {
        let y = [0, 0, 0, 1, 1, 1];
        let p = [0.1, 0.3, 0.6, 0.4, 0.7, 0.9];
        let results = sweep_thresholds(&y, &p, &default_threshold_grid()).unwrap();
        let summary = summarize_thresholds(&results, 0.5, 0.70).unwrap();

        assert_eq!(summary.default.threshold, 0.5);
        assert_eq!(summary.best_recall.recall, 1.0);
        // Lowest threshold reaching full recall comes first
        assert_eq!(summary.best_recall.threshold, 0.10);
        let par = summary.precision_at_recall.unwrap();
        assert!(par.recall >= 0.70);
        assert!((par.precision - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_metrics_reject_nan_and_length_mismatch() {
        assert!(calculate_metrics(&[0, 1], &[0.5], 0.5).is_err());
        assert!(calculate_metrics(&[0, 1], &[0.5, f64::NAN], 0.5).is_err());
    }

    #[test]
    fn test_empty_sweep_is_error() {
        assert!(summarize_thresholds(&[], 0.5, 0.7).is_err());
    }
}

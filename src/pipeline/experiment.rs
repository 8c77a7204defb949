//! Experiment preparation and model evaluation
//!
//! [`prepare_experiment`] runs the whole preparation flow for one model family:
//! split, fit the preprocessing pipeline on train, transform every partition,
//! then resample and weight the training partition only. Models stay opaque
//! behind the [`Classifier`] trait.

use ndarray::{Array2, Axis};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use super::config::ExperimentConfig;
use super::error::{PrepError, Result};
use super::evaluation::{calculate_metrics, predict_at_threshold, ClassificationMetrics};
use super::loader::PreparedFrame;
use super::preprocess::{ModelFamily, PreprocessPipeline};
use super::resampling::ResamplingMethod;
use super::split::{split_dataset, stratified_k_fold, SplitSizes};
use super::target::label_counts;
use super::weights::{sample_weights, WeightingMethod};

/// A binary classifier trained on dense feature matrices
pub trait Classifier: Send {
    /// Train on `x`/`y`, optionally weighting each sample.
    fn fit(&mut self, x: &Array2<f64>, y: &[i32], sample_weight: Option<&[f64]>) -> Result<()>;

    /// Probability of the positive class for every row.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Vec<f64>>;

    /// Hard predictions at `threshold`.
    fn predict(&self, x: &Array2<f64>, threshold: f64) -> Result<Vec<i32>> {
        Ok(predict_at_threshold(&self.predict_proba(x)?, threshold))
    }
}

/// Features and labels of one partition
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledMatrix {
    pub x: Array2<f64>,
    pub y: Vec<i32>,
}

/// Training partition after resampling, with optional sample weights
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    pub x: Array2<f64>,
    pub y: Vec<i32>,
    pub weights: Option<Vec<f64>>,
}

/// Everything a model run needs, produced by [`prepare_experiment`]
#[derive(Debug, Clone)]
pub struct PreparedExperiment {
    pub family: ModelFamily,
    pub pipeline: PreprocessPipeline,
    pub feature_names: Vec<String>,
    pub split_sizes: SplitSizes,
    pub resampling: ResamplingMethod,
    pub weighting: Option<WeightingMethod>,
    pub train: TrainingSet,
    pub validation: LabeledMatrix,
    pub test: LabeledMatrix,
    /// negatives / positives of the (resampled) training labels, for
    /// gradient-boosting models that take a positive-class scale
    pub scale_pos_weight: Option<f64>,
}

/// Split, preprocess, resample and weight a labelled frame.
pub fn prepare_experiment(
    data: &PreparedFrame,
    config: &ExperimentConfig,
) -> Result<PreparedExperiment> {
    config.validate()?;
    let family = config.family;
    let resampling = config.resampling_method();
    let weighting = config.weighting_method();
    info!(
        "Preparing {} experiment: resampling={}, weighting={}",
        family,
        resampling,
        weighting.map_or("none", |w| w.name())
    );

    let split = split_dataset(
        &data.frame,
        &data.labels,
        config.test_size,
        config.val_size,
        config.seed,
    )?;

    let mut pipeline = PreprocessPipeline::build(family)
        .with_categorical_columns(config.categorical_columns.iter().cloned())
        .with_passthrough_columns(config.passthrough_columns());
    let x_train = pipeline.fit_transform(&split.train.frame)?;
    let x_val = pipeline.transform(&split.validation.frame)?;
    let x_test = pipeline.transform(&split.test.frame)?;
    let feature_names = x_train.feature_names.clone();

    let resampled = resampling.apply(&x_train.values, &split.train.labels, config.seed)?;

    let weights = weighting
        .map(|method| sample_weights(&resampled.y, method, config.cost_ratio))
        .transpose()?;

    let (negatives, positives) = label_counts(&resampled.y);
    let scale_pos_weight = if positives > 0 {
        let spw = negatives as f64 / positives as f64;
        info!("Calculated scale_pos_weight: {:.4}", spw);
        Some(spw)
    } else {
        warn!("Training partition has no positive labels; scale_pos_weight undefined");
        None
    };

    Ok(PreparedExperiment {
        family,
        pipeline,
        feature_names,
        split_sizes: split.sizes(),
        resampling,
        weighting,
        train: TrainingSet {
            x: resampled.x,
            y: resampled.y,
            weights,
        },
        validation: LabeledMatrix {
            x: x_val.values,
            y: split.validation.labels,
        },
        test: LabeledMatrix {
            x: x_test.values,
            y: split.test.labels,
        },
        scale_pos_weight,
    })
}

/// Validation and test metrics of a fitted model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelEvaluation {
    pub validation: ClassificationMetrics,
    pub test: ClassificationMetrics,
}

/// Score a fitted model on the validation and test partitions.
pub fn evaluate_model<C: Classifier + ?Sized>(
    model: &C,
    validation: &LabeledMatrix,
    test: &LabeledMatrix,
    threshold: f64,
) -> Result<ModelEvaluation> {
    let validation = score(model, validation, threshold)?;
    let test = score(model, test, threshold)?;
    info!(
        "Validation F1 {:.4} / AUC {:.4}; test F1 {:.4} / AUC {:.4}",
        validation.f1, validation.roc_auc, test.f1, test.roc_auc
    );
    Ok(ModelEvaluation { validation, test })
}

fn score<C: Classifier + ?Sized>(
    model: &C,
    data: &LabeledMatrix,
    threshold: f64,
) -> Result<ClassificationMetrics> {
    let probas = model.predict_proba(&data.x)?;
    calculate_metrics(&data.y, &probas, threshold)
}

/// Metrics compared across sweep runs and cross-validation folds
const REPORTED_METRICS: [(&str, fn(&ClassificationMetrics) -> f64); 5] = [
    ("accuracy", |m| m.accuracy),
    ("precision", |m| m.precision),
    ("recall", |m| m.recall),
    ("f1", |m| m.f1),
    ("roc_auc", |m| m.roc_auc),
];

// =============================================================================
// Cross-validation
// =============================================================================

/// Mean and population standard deviation of one metric across folds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSpread {
    pub mean: f64,
    pub std: f64,
}

/// Held-out metrics of every cross-validation fold, in fold order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossValidation {
    pub folds: Vec<ClassificationMetrics>,
}

impl CrossValidation {
    pub fn spread(&self, metric: impl Fn(&ClassificationMetrics) -> f64) -> MetricSpread {
        let n = self.folds.len().max(1) as f64;
        let mean = self.folds.iter().map(&metric).sum::<f64>() / n;
        let var = self
            .folds
            .iter()
            .map(|m| (metric(m) - mean).powi(2))
            .sum::<f64>()
            / n;
        MetricSpread {
            mean,
            std: var.sqrt(),
        }
    }

    /// Spread of accuracy, precision, recall, F1 and ROC-AUC.
    pub fn summary(&self) -> Vec<(&'static str, MetricSpread)> {
        REPORTED_METRICS
            .into_iter()
            .map(|(name, f)| (name, self.spread(f)))
            .collect()
    }
}

/// Stratified k-fold cross-validation on the training partition.
///
/// Each fold trains a fresh model from `factory` on the other folds (with their
/// sample weights, if any) and scores the held-out fold at `threshold`. Folds
/// run in parallel and are deterministic for a seed.
pub fn cross_validate<C, F>(
    train: &TrainingSet,
    n_folds: usize,
    factory: F,
    threshold: f64,
    seed: u64,
) -> Result<CrossValidation>
where
    C: Classifier,
    F: Fn() -> C + Sync,
{
    info!("Performing {}-fold cross-validation", n_folds);
    let folds = stratified_k_fold(&train.y, n_folds, seed)?;

    let scored = folds
        .par_iter()
        .map(|fold| {
            let x_fit = train.x.select(Axis(0), &fold.train);
            let y_fit: Vec<i32> = fold.train.iter().map(|&i| train.y[i]).collect();
            let weights: Option<Vec<f64>> = train
                .weights
                .as_ref()
                .map(|w| fold.train.iter().map(|&i| w[i]).collect());

            let mut model = factory();
            model.fit(&x_fit, &y_fit, weights.as_deref())?;

            let held_out = LabeledMatrix {
                x: train.x.select(Axis(0), &fold.test),
                y: fold.test.iter().map(|&i| train.y[i]).collect(),
            };
            score(&model, &held_out, threshold)
        })
        .collect::<Result<Vec<_>>>()?;

    let cv = CrossValidation { folds: scored };
    for (metric, spread) in cv.summary() {
        info!(
            "  {}: {:.4} (+/- {:.4})",
            metric.to_uppercase(),
            spread.mean,
            spread.std
        );
    }
    Ok(cv)
}

// =============================================================================
// Cost-ratio sweep
// =============================================================================

/// One model run of the sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostRatioRun {
    /// `None` for the unweighted baseline
    pub cost_ratio: Option<f64>,
    pub label: String,
    pub test: ClassificationMetrics,
}

/// Results of a cost-ratio sweep, baseline first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostRatioSweep {
    pub runs: Vec<CostRatioRun>,
}

impl CostRatioSweep {
    /// Run with the highest value of `metric`; earlier runs win ties.
    pub fn best_by(&self, metric: impl Fn(&ClassificationMetrics) -> f64) -> Option<&CostRatioRun> {
        let mut best: Option<&CostRatioRun> = None;
        for run in &self.runs {
            if best.map_or(true, |b| metric(&run.test) > metric(&b.test)) {
                best = Some(run);
            }
        }
        best
    }

    /// Best run per reported metric, as (metric name, run).
    pub fn best_per_metric(&self) -> Vec<(&'static str, &CostRatioRun)> {
        REPORTED_METRICS
            .into_iter()
            .filter_map(|(name, f)| self.best_by(f).map(|run| (name, run)))
            .collect()
    }
}

/// Train a fresh model per cost ratio (plus an unweighted baseline) on the
/// training partition and score each on test.
///
/// Runs are independent and execute in parallel; each gets its own model from
/// `factory`. Results keep the order baseline, then `ratios` as given.
pub fn cost_ratio_sweep<C, F>(
    experiment: &PreparedExperiment,
    ratios: &[f64],
    factory: F,
    threshold: f64,
) -> Result<CostRatioSweep>
where
    C: Classifier,
    F: Fn() -> C + Sync,
{
    if let Some(bad) = ratios.iter().find(|r| !r.is_finite() || **r <= 0.0) {
        return Err(PrepError::invalid_parameter(
            "cost_ratio",
            format!("must be a positive finite number, got {}", bad),
        ));
    }

    let settings: Vec<Option<f64>> = std::iter::once(None)
        .chain(ratios.iter().copied().map(Some))
        .collect();

    let runs = settings
        .par_iter()
        .map(|&ratio| {
            let weights = ratio
                .map(|r| sample_weights(&experiment.train.y, WeightingMethod::CostRatio, r))
                .transpose()?;

            let mut model = factory();
            model.fit(&experiment.train.x, &experiment.train.y, weights.as_deref())?;
            let test = score(&model, &experiment.test, threshold)?;

            let label = match ratio {
                Some(r) => format!("Cost-Sensitive (ratio={})", r),
                None => "Baseline (no sample weights)".to_string(),
            };
            Ok(CostRatioRun {
                cost_ratio: ratio,
                label,
                test,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let sweep = CostRatioSweep { runs };
    for (metric, run) in sweep.best_per_metric() {
        info!("Best {}: {}", metric, run.label);
    }
    Ok(sweep)
}

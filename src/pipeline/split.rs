//! Stratified train/validation/test splitting
//!
//! The test partition is carved out first; the remainder is then split again so
//! that the validation partition is `val_fraction` of the original total. Both
//! splits preserve the label proportions and are deterministic for a seed.

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;

use super::error::{PrepError, Result};
use super::resampling::class_indices;

/// Default fraction of records held out for testing
pub const DEFAULT_TEST_FRACTION: f64 = 0.15;
/// Default fraction of records held out for validation
pub const DEFAULT_VAL_FRACTION: f64 = 0.15;

/// Row indices of each partition, in shuffled order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
    pub test: Vec<usize>,
}

/// One partition of the data set
#[derive(Debug, Clone)]
pub struct Partition {
    pub frame: DataFrame,
    pub labels: Vec<i32>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Share of positive labels, 0.0 for an empty partition.
    pub fn positive_rate(&self) -> f64 {
        positive_rate(&self.labels)
    }
}

/// Train, validation and test partitions
#[derive(Debug, Clone)]
pub struct DataSplit {
    pub train: Partition,
    pub validation: Partition,
    pub test: Partition,
}

/// Partition sizes and label rates, for reporting
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SplitSizes {
    pub train: usize,
    pub validation: usize,
    pub test: usize,
    pub train_positive_rate: f64,
    pub validation_positive_rate: f64,
    pub test_positive_rate: f64,
}

impl DataSplit {
    pub fn sizes(&self) -> SplitSizes {
        SplitSizes {
            train: self.train.len(),
            validation: self.validation.len(),
            test: self.test.len(),
            train_positive_rate: self.train.positive_rate(),
            validation_positive_rate: self.validation.positive_rate(),
            test_positive_rate: self.test.positive_rate(),
        }
    }
}

fn positive_rate(labels: &[i32]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    labels.iter().filter(|&&l| l == 1).count() as f64 / labels.len() as f64
}

/// Split `labels` positions into (rest, test) with `test_fraction` of rows in
/// test, preserving class proportions.
///
/// The test size is `ceil(test_fraction * n)`. Per-class test counts are the
/// floor of each class's proportional share, with the leftover rows handed to
/// the classes with the largest remainders.
pub fn stratified_split(
    labels: &[i32],
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(PrepError::invalid_parameter(
            "test_fraction",
            format!("must be in (0, 1), got {}", test_fraction),
        ));
    }

    let n = labels.len();
    let classes = class_indices(labels);
    let n_test = (test_fraction * n as f64).ceil() as usize;
    let n_train = n.saturating_sub(n_test);

    if let Some((class, members)) = classes.iter().find(|(_, m)| m.len() < 2) {
        return Err(PrepError::invalid_parameter(
            "labels",
            format!(
                "class {} has only {} member(s); stratified splitting needs at least 2",
                class,
                members.len()
            ),
        ));
    }
    if n_test < classes.len() || n_train < classes.len() {
        return Err(PrepError::invalid_parameter(
            "test_fraction",
            format!(
                "{} test and {} remaining rows cannot hold all {} classes",
                n_test,
                n_train,
                classes.len()
            ),
        ));
    }

    // Proportional allocation with largest-remainder rounding
    let mut allocation: Vec<(usize, f64)> = classes
        .values()
        .map(|members| {
            let share = members.len() as f64 * n_test as f64 / n as f64;
            (share.floor() as usize, share - share.floor())
        })
        .collect();
    let mut leftover = n_test - allocation.iter().map(|(c, _)| c).sum::<usize>();
    let mut by_remainder: Vec<usize> = (0..allocation.len()).collect();
    by_remainder.sort_by(|&a, &b| {
        allocation[b]
            .1
            .partial_cmp(&allocation[a].1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    for &i in by_remainder.iter().cycle() {
        if leftover == 0 {
            break;
        }
        allocation[i].0 += 1;
        leftover -= 1;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut rest = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);
    for (members, (n_class_test, _)) in classes.values().zip(&allocation) {
        let mut shuffled = members.clone();
        shuffled.shuffle(&mut rng);
        let (class_test, class_rest) = shuffled.split_at(*n_class_test);
        test.extend_from_slice(class_test);
        rest.extend_from_slice(class_rest);
    }
    rest.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Ok((rest, test))
}

/// Three-way stratified split of row positions.
pub fn train_val_test_indices(
    labels: &[i32],
    test_fraction: f64,
    val_fraction: f64,
    seed: u64,
) -> Result<SplitIndices> {
    if !(val_fraction > 0.0) || test_fraction + val_fraction >= 1.0 {
        return Err(PrepError::invalid_parameter(
            "val_fraction",
            format!(
                "must be positive with test_fraction + val_fraction < 1, got {} + {}",
                test_fraction, val_fraction
            ),
        ));
    }

    let (rest, test) = stratified_split(labels, test_fraction, seed)?;

    let rest_labels: Vec<i32> = rest.iter().map(|&i| labels[i]).collect();
    let relative_val = val_fraction / (1.0 - test_fraction);
    let (train_pos, val_pos) = stratified_split(&rest_labels, relative_val, seed)?;

    Ok(SplitIndices {
        train: train_pos.into_iter().map(|p| rest[p]).collect(),
        validation: val_pos.into_iter().map(|p| rest[p]).collect(),
        test,
    })
}

/// Split a frame and its labels into stratified train/validation/test partitions.
pub fn split_dataset(
    df: &DataFrame,
    labels: &[i32],
    test_fraction: f64,
    val_fraction: f64,
    seed: u64,
) -> Result<DataSplit> {
    if df.height() != labels.len() {
        return Err(PrepError::invalid_parameter(
            "labels",
            format!("{} labels for {} rows", labels.len(), df.height()),
        ));
    }

    let indices = train_val_test_indices(labels, test_fraction, val_fraction, seed)?;
    let split = DataSplit {
        train: take_partition(df, labels, &indices.train)?,
        validation: take_partition(df, labels, &indices.validation)?,
        test: take_partition(df, labels, &indices.test)?,
    };

    let sizes = split.sizes();
    info!(
        "Split sizes - train: {}, val: {}, test: {}",
        sizes.train, sizes.validation, sizes.test
    );
    info!(
        "Churn rate - train: {:.4}, val: {:.4}, test: {:.4}",
        sizes.train_positive_rate, sizes.validation_positive_rate, sizes.test_positive_rate
    );
    Ok(split)
}

/// Row positions of one cross-validation fold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Stratified k-fold assignment of `labels` positions.
///
/// Each class is shuffled with `seed` and dealt round-robin across the folds,
/// continuing where the previous class stopped, so fold sizes differ by at most
/// one and every fold keeps the class proportions. Every class needs at least
/// `n_folds` members.
pub fn stratified_k_fold(labels: &[i32], n_folds: usize, seed: u64) -> Result<Vec<Fold>> {
    if n_folds < 2 {
        return Err(PrepError::invalid_parameter(
            "n_folds",
            format!("must be at least 2, got {}", n_folds),
        ));
    }

    let classes = class_indices(labels);
    if let Some((class, members)) = classes.iter().find(|(_, m)| m.len() < n_folds) {
        return Err(PrepError::invalid_parameter(
            "n_folds",
            format!(
                "class {} has {} member(s), fewer than {} folds",
                class,
                members.len(),
                n_folds
            ),
        ));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut assignment = vec![0usize; labels.len()];
    let mut next = 0;
    for members in classes.values() {
        let mut shuffled = members.clone();
        shuffled.shuffle(&mut rng);
        for row in shuffled {
            assignment[row] = next;
            next = (next + 1) % n_folds;
        }
    }

    let folds = (0..n_folds)
        .map(|k| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..labels.len()).partition(|&row| assignment[row] == k);
            Fold { train, test }
        })
        .collect();
    Ok(folds)
}

fn take_partition(df: &DataFrame, labels: &[i32], rows: &[usize]) -> Result<Partition> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        rows.iter().map(|&i| i as IdxSize).collect(),
    );
    Ok(Partition {
        frame: df.take(&idx)?,
        labels: rows.iter().map(|&i| labels[i]).collect(),
    })
}

//! Class-imbalance resampling strategies
//!
//! Every strategy is a pure function of (features, labels, seed) and is meant to
//! be applied to the training partition only. Over-samplers raise every
//! non-majority class to the majority count.

pub mod adasyn;
pub mod cleaning;
pub mod neighbors;
pub mod smote;

use std::collections::BTreeMap;
use std::fmt;

use ndarray::{concatenate, Array2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::{PrepError, Result};

pub use adasyn::Adasyn;
pub use cleaning::{edited_nearest_neighbours, remove_tomek_links, ENN_NEIGHBORS};
pub use smote::{Smote, DEFAULT_K_NEIGHBORS};

/// Resampled training data
#[derive(Debug, Clone, PartialEq)]
pub struct ResampleResult {
    pub x: Array2<f64>,
    pub y: Vec<i32>,
}

/// Resampling strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResamplingMethod {
    /// Identity; imbalance is left to sample weights
    #[default]
    None,
    Smote,
    Adasyn,
    /// SMOTE followed by Tomek link removal
    SmoteTomek,
    /// SMOTE followed by Edited Nearest Neighbours cleaning
    SmoteEnn,
}

impl ResamplingMethod {
    pub const ALL: [ResamplingMethod; 5] = [
        ResamplingMethod::None,
        ResamplingMethod::Smote,
        ResamplingMethod::Adasyn,
        ResamplingMethod::SmoteTomek,
        ResamplingMethod::SmoteEnn,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ResamplingMethod::None => "none",
            ResamplingMethod::Smote => "smote",
            ResamplingMethod::Adasyn => "adasyn",
            ResamplingMethod::SmoteTomek => "smote_tomek",
            ResamplingMethod::SmoteEnn => "smote_enn",
        }
    }

    /// Resolve a strategy name case-insensitively. Unknown or empty names
    /// fall back to [`ResamplingMethod::None`] with a warning.
    pub fn from_name(name: &str) -> Self {
        let normalized = name.trim().to_lowercase();
        match Self::ALL.iter().find(|m| m.name() == normalized) {
            Some(method) => *method,
            None => {
                warn!(
                    "Unknown resampling method '{}'; available: {:?}. Using 'none'",
                    name,
                    Self::ALL.map(|m| m.name())
                );
                ResamplingMethod::None
            }
        }
    }

    /// Resample `(x, y)` with an RNG seeded from `seed`.
    pub fn apply(&self, x: &Array2<f64>, y: &[i32], seed: u64) -> Result<ResampleResult> {
        if x.nrows() != y.len() {
            return Err(PrepError::invalid_parameter(
                "labels",
                format!("{} labels for {} feature rows", y.len(), x.nrows()),
            ));
        }

        let counts = class_counts(y);
        info!(
            "Applying {} resampling to {:?}; class distribution {:?}",
            self,
            x.dim(),
            counts
        );

        if *self != ResamplingMethod::None && counts.len() < 2 {
            return Err(PrepError::invalid_parameter(
                "labels",
                format!("{} needs at least two classes, found {}", self, counts.len()),
            ));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let result = match self {
            ResamplingMethod::None => ResampleResult {
                x: x.clone(),
                y: y.to_vec(),
            },
            ResamplingMethod::Smote => Smote::new().resample(x, y, &mut rng)?,
            ResamplingMethod::Adasyn => Adasyn::new().resample(x, y, &mut rng)?,
            ResamplingMethod::SmoteTomek => {
                let over = Smote::new().resample(x, y, &mut rng)?;
                remove_tomek_links(&over.x, &over.y)?
            }
            ResamplingMethod::SmoteEnn => {
                let over = Smote::new().resample(x, y, &mut rng)?;
                edited_nearest_neighbours(&over.x, &over.y, ENN_NEIGHBORS)?
            }
        };

        info!(
            "Resampled shape {:?}; class distribution {:?}",
            result.x.dim(),
            class_counts(&result.y)
        );
        Ok(result)
    }
}

impl fmt::Display for ResamplingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Count samples per class, ordered by label.
pub fn class_counts(y: &[i32]) -> BTreeMap<i32, usize> {
    let mut counts = BTreeMap::new();
    for &label in y {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Row indices per class, ordered by label.
pub fn class_indices(y: &[i32]) -> BTreeMap<i32, Vec<usize>> {
    let mut indices: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        indices.entry(label).or_default().push(i);
    }
    indices
}

fn majority_count(counts: &BTreeMap<i32, usize>) -> usize {
    counts.values().copied().max().unwrap_or(0)
}

/// Stack flat row-major `rows` under `x`.
fn append_rows(x: &Array2<f64>, rows: Vec<f64>) -> Result<Array2<f64>> {
    if rows.is_empty() {
        return Ok(x.clone());
    }
    let n_features = x.ncols();
    let extra = Array2::from_shape_vec((rows.len() / n_features, n_features), rows)?;
    Ok(concatenate(Axis(0), &[x.view(), extra.view()])?)
}

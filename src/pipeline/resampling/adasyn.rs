//! ADASYN (Adaptive Synthetic Sampling)
//!
//! Like SMOTE, but the number of synthetic samples drawn around each minority
//! sample is proportional to how many of its neighbours (over the whole data
//! set) belong to other classes, so hard-to-learn regions get more samples.

use ndarray::Array2;
use rand::prelude::*;
use tracing::debug;

use super::neighbors::neighbor_lists;
use super::smote::{interpolate, DEFAULT_K_NEIGHBORS};
use super::{append_rows, class_counts, class_indices, majority_count, ResampleResult};
use crate::pipeline::error::{PrepError, Result};

/// ADASYN adaptive over-sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adasyn {
    k_neighbors: usize,
}

impl Adasyn {
    pub fn new() -> Self {
        Self {
            k_neighbors: DEFAULT_K_NEIGHBORS,
        }
    }

    /// Set number of neighbors
    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    pub fn resample(&self, x: &Array2<f64>, y: &[i32], rng: &mut StdRng) -> Result<ResampleResult> {
        let k = self.k_neighbors;
        let counts = class_counts(y);
        let target = majority_count(&counts);
        let indices = class_indices(y);
        let all: Vec<usize> = (0..y.len()).collect();

        let mut synthetic: Vec<f64> = Vec::new();
        let mut synthetic_y: Vec<i32> = Vec::new();

        for (&class, &count) in &counts {
            let n_generate = target - count;
            if n_generate == 0 {
                continue;
            }
            if count < k + 1 {
                return Err(PrepError::InsufficientSamples {
                    method: "ADASYN".to_string(),
                    class,
                    available: count,
                    required: k + 1,
                });
            }

            let members = &indices[&class];

            // Difficulty: share of each sample's neighbours from other classes
            let difficulty: Vec<f64> = neighbor_lists(x, members, &all, k)
                .iter()
                .map(|nn| nn.iter().filter(|&&j| y[j] != class).count() as f64 / k as f64)
                .collect();
            let total: f64 = difficulty.iter().sum();
            if total == 0.0 {
                return Err(PrepError::NoHardExamples {
                    method: "ADASYN".to_string(),
                    class,
                });
            }

            let per_sample: Vec<usize> = difficulty
                .iter()
                .map(|r| (r / total * n_generate as f64).round() as usize)
                .collect();
            debug!(
                "ADASYN: generating {} samples for class {} (requested {})",
                per_sample.iter().sum::<usize>(),
                class,
                n_generate
            );

            let class_neighbors = neighbor_lists(x, members, members, k);
            for (i, &n_i) in per_sample.iter().enumerate() {
                for _ in 0..n_i {
                    let nn = class_neighbors[i][rng.gen_range(0..class_neighbors[i].len())];
                    let gap: f64 = rng.gen();
                    synthetic.extend(interpolate(x.row(members[i]), x.row(nn), gap));
                    synthetic_y.push(class);
                }
            }
        }

        let x_out = append_rows(x, synthetic)?;
        let mut y_out = y.to_vec();
        y_out.extend(synthetic_y);
        Ok(ResampleResult { x: x_out, y: y_out })
    }
}

impl Default for Adasyn {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_concentrate_near_the_border() {
        // Minority points 0..8 are isolated, 9 and 10 sit inside the majority cloud
        let mut rows: Vec<f64> = Vec::new();
        let mut y = Vec::new();
        for i in 0..40 {
            rows.push(50.0 + i as f64 * 0.1);
            y.push(0);
        }
        for i in 0..9 {
            rows.push(i as f64 * 0.1);
            y.push(1);
        }
        rows.extend([50.05, 50.15]);
        y.extend([1, 1]);

        let x = Array2::from_shape_vec((rows.len(), 1), rows).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let out = Adasyn::new().resample(&x, &y, &mut rng).unwrap();

        let positives = out.y.iter().filter(|&&l| l == 1).count();
        assert!((positives as i64 - 40).abs() <= 2);
    }

    #[test]
    fn test_separable_classes_have_no_hard_examples() {
        let mut rows: Vec<f64> = (0..20).map(|i| i as f64).collect();
        rows.extend((0..8).map(|i| 1000.0 + i as f64));
        let mut y = vec![0; 20];
        y.extend(vec![1; 8]);
        let x = Array2::from_shape_vec((28, 1), rows).unwrap();

        let mut rng = StdRng::seed_from_u64(0);
        let err = Adasyn::new().resample(&x, &y, &mut rng).unwrap_err();
        assert!(matches!(err, PrepError::NoHardExamples { class: 1, .. }));
    }

    #[test]
    fn test_balanced_input_is_unchanged() {
        let x = Array2::from_shape_fn((12, 2), |(i, j)| (i * 2 + j) as f64);
        let y: Vec<i32> = (0..12).map(|i| i % 2).collect();
        let mut rng = StdRng::seed_from_u64(3);
        let out = Adasyn::new().resample(&x, &y, &mut rng).unwrap();
        assert_eq!(out.x, x);
        assert_eq!(out.y, y);
    }
}

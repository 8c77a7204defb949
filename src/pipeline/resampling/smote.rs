//! SMOTE (Synthetic Minority Over-sampling Technique)

use ndarray::{Array2, ArrayView1};
use rand::prelude::*;
use tracing::debug;

use super::neighbors::neighbor_lists;
use super::{append_rows, class_counts, class_indices, majority_count, ResampleResult};
use crate::pipeline::error::{PrepError, Result};

/// Default number of same-class neighbours used for interpolation
pub const DEFAULT_K_NEIGHBORS: usize = 5;

/// SMOTE over-sampler. Every class is raised to the majority class count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Smote {
    k_neighbors: usize,
}

impl Smote {
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

    pub fn k_neighbors(&self) -> usize {
        self.k_neighbors
    }

    /// Append synthetic rows until every class matches the majority count.
    pub fn resample(&self, x: &Array2<f64>, y: &[i32], rng: &mut StdRng) -> Result<ResampleResult> {
        let k = self.k_neighbors;
        let counts = class_counts(y);
        let target = majority_count(&counts);
        let indices = class_indices(y);

        let mut synthetic: Vec<f64> = Vec::new();
        let mut synthetic_y: Vec<i32> = Vec::new();

        for (&class, &count) in &counts {
            let n_generate = target - count;
            if n_generate == 0 {
                continue;
            }
            if count < k + 1 {
                return Err(PrepError::InsufficientSamples {
                    method: "SMOTE".to_string(),
                    class,
                    available: count,
                    required: k + 1,
                });
            }

            let members = &indices[&class];
            let neighbors = neighbor_lists(x, members, members, k);
            debug!(
                "SMOTE: generating {} samples for class {} from {} originals",
                n_generate, class, count
            );

            for _ in 0..n_generate {
                let i = rng.gen_range(0..members.len());
                let nn = neighbors[i][rng.gen_range(0..neighbors[i].len())];
                let gap: f64 = rng.gen();
                synthetic.extend(interpolate(x.row(members[i]), x.row(nn), gap));
                synthetic_y.push(class);
            }
        }

        let x_out = append_rows(x, synthetic)?;
        let mut y_out = y.to_vec();
        y_out.extend(synthetic_y);
        Ok(ResampleResult { x: x_out, y: y_out })
    }
}

impl Default for Smote {
    fn default() -> Self {
        Self::new()
    }
}

/// Point on the segment from `point` towards `neighbor` at fraction `gap`.
pub(super) fn interpolate<'a>(
    point: ArrayView1<'a, f64>,
    neighbor: ArrayView1<'a, f64>,
    gap: f64,
) -> impl Iterator<Item = f64> + 'a {
    point
        .into_iter()
        .zip(neighbor)
        .map(move |(&p, &n)| p + gap * (n - p))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_class_data(n_neg: usize, n_pos: usize) -> (Array2<f64>, Vec<i32>) {
        let n = n_neg + n_pos;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            if i < n_neg {
                i as f64 + j as f64
            } else {
                100.0 + (i - n_neg) as f64 * 0.5 + j as f64
            }
        });
        let mut y = vec![0; n_neg];
        y.extend(vec![1; n_pos]);
        (x, y)
    }

    #[test]
    fn test_minority_raised_to_majority() {
        let (x, y) = two_class_data(40, 10);
        let mut rng = StdRng::seed_from_u64(42);
        let out = Smote::new().resample(&x, &y, &mut rng).unwrap();
        let counts = class_counts(&out.y);
        assert_eq!(counts[&0], 40);
        assert_eq!(counts[&1], 40);
        assert_eq!(out.x.nrows(), 80);
        // Originals kept in place
        assert_eq!(out.x.row(3), x.row(3));
    }

    #[test]
    fn test_synthetic_rows_stay_inside_class_hull() {
        let (x, y) = two_class_data(30, 8);
        let mut rng = StdRng::seed_from_u64(7);
        let out = Smote::new().resample(&x, &y, &mut rng).unwrap();
        for row in out.x.rows().into_iter().skip(38) {
            assert!(row[0] >= 100.0 && row[0] <= 103.5);
        }
    }

    #[test]
    fn test_too_few_samples() {
        let (x, y) = two_class_data(20, 5);
        let mut rng = StdRng::seed_from_u64(1);
        match Smote::new().resample(&x, &y, &mut rng).unwrap_err() {
            PrepError::InsufficientSamples {
                class,
                available,
                required,
                ..
            } => {
                assert_eq!(class, 1);
                assert_eq!(available, 5);
                assert_eq!(required, 6);
            }
            other => panic!("expected insufficient samples, got {other:?}"),
        }
    }

    #[test]
    fn test_fewer_neighbours_allow_small_classes() {
        let (x, y) = two_class_data(20, 3);
        let mut rng = StdRng::seed_from_u64(1);
        let out = Smote::new()
            .with_k_neighbors(2)
            .resample(&x, &y, &mut rng)
            .unwrap();
        assert_eq!(class_counts(&out.y)[&1], 20);
    }
}

//! Brute-force k-nearest-neighbour search over matrix rows

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;

/// Ordered (distance, index) pair for BinaryHeap-based partial sort.
/// Ties on distance fall back to the lower row index so results are stable.
#[derive(Debug, Clone, Copy)]
struct DistIdx(f64, usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for DistIdx {}
impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .partial_cmp(&other.0)
            .unwrap_or(Ordering::Equal)
            .then(self.1.cmp(&other.1))
    }
}

/// Squared Euclidean distance
pub fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// The `k` rows of `candidates` closest to row `query`, nearest first.
///
/// The query row itself is excluded by index, so exact duplicates of the query
/// still count as neighbours.
pub fn k_nearest(x: &Array2<f64>, query: usize, candidates: &[usize], k: usize) -> Vec<usize> {
    let point = x.row(query);
    let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);

    for &i in candidates {
        if i == query {
            continue;
        }
        let candidate = DistIdx(squared_distance(point, x.row(i)), i);
        if heap.len() < k {
            heap.push(candidate);
        } else if let Some(&worst) = heap.peek() {
            if candidate < worst {
                heap.pop();
                heap.push(candidate);
            }
        }
    }

    heap.into_sorted_vec().into_iter().map(|DistIdx(_, i)| i).collect()
}

/// Neighbour lists for every row in `queries`, computed in parallel.
/// Output order matches `queries`.
pub fn neighbor_lists(
    x: &Array2<f64>,
    queries: &[usize],
    candidates: &[usize],
    k: usize,
) -> Vec<Vec<usize>> {
    queries
        .par_iter()
        .map(|&q| k_nearest(x, q, candidates, k))
        .collect()
}

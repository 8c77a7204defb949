//! Under-sampling cleaners applied after SMOTE in the hybrid strategies

use ndarray::{Array2, Axis};
use tracing::debug;

use super::neighbors::neighbor_lists;
use super::ResampleResult;
use crate::pipeline::error::Result;

/// Neighbours consulted by Edited Nearest Neighbours
pub const ENN_NEIGHBORS: usize = 3;

/// Remove every sample that takes part in a Tomek link.
///
/// Two samples form a link when each is the other's nearest neighbour and their
/// labels differ. Both members of each link are removed.
pub fn remove_tomek_links(x: &Array2<f64>, y: &[i32]) -> Result<ResampleResult> {
    let all: Vec<usize> = (0..y.len()).collect();
    let nearest: Vec<Option<usize>> = neighbor_lists(x, &all, &all, 1)
        .into_iter()
        .map(|nn| nn.first().copied())
        .collect();

    let keep: Vec<bool> = all
        .iter()
        .map(|&i| match nearest[i] {
            Some(j) => !(y[i] != y[j] && nearest[j] == Some(i)),
            None => true,
        })
        .collect();

    debug!(
        "Tomek links: removing {} samples",
        keep.iter().filter(|k| !**k).count()
    );
    Ok(select_rows(x, y, &keep))
}

/// Edited Nearest Neighbours: drop every sample whose `n_neighbors` nearest
/// neighbours do not all share its label. Applies to every class.
pub fn edited_nearest_neighbours(
    x: &Array2<f64>,
    y: &[i32],
    n_neighbors: usize,
) -> Result<ResampleResult> {
    let all: Vec<usize> = (0..y.len()).collect();
    let keep: Vec<bool> = neighbor_lists(x, &all, &all, n_neighbors)
        .iter()
        .enumerate()
        .map(|(i, nn)| nn.iter().all(|&j| y[j] == y[i]))
        .collect();

    debug!(
        "ENN: removing {} samples",
        keep.iter().filter(|k| !**k).count()
    );
    Ok(select_rows(x, y, &keep))
}

fn select_rows(x: &Array2<f64>, y: &[i32], keep: &[bool]) -> ResampleResult {
    let rows: Vec<usize> = keep
        .iter()
        .enumerate()
        .filter_map(|(i, &k)| k.then_some(i))
        .collect();
    ResampleResult {
        x: x.select(Axis(0), &rows),
        y: rows.iter().map(|&i| y[i]).collect(),
    }
}

//! One-hot encoding of categorical columns
//!
//! Each column expands into one indicator feature per category seen at fit time,
//! in sorted order. Categories not seen during fit (and nulls) encode as all
//! zeros instead of failing.

use std::collections::BTreeSet;

use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::Result;
use super::schema::{require_columns, string_values};

/// Learned categories for one encoded column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotColumn {
    pub column: String,
    pub categories: Vec<String>,
}

impl OneHotColumn {
    fn position(&self, value: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
    }

    /// Output feature names, `{column}_{category}`.
    pub fn feature_names(&self) -> impl Iterator<Item = String> + '_ {
        self.categories
            .iter()
            .map(move |cat| format!("{}_{}", self.column, cat))
    }
}

/// Fitted one-hot encoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    columns: Vec<OneHotColumn>,
}

impl OneHotEncoder {
    /// Learn the sorted category set of each column from training data.
    pub fn fit<S: AsRef<str>>(df: &DataFrame, columns: &[S]) -> Result<Self> {
        require_columns(df, columns, "one-hot fit")?;

        let columns = columns
            .iter()
            .map(|col| {
                let col = col.as_ref();
                let values = string_values(df, col)?;
                let categories: BTreeSet<String> = values.into_iter().flatten().collect();
                debug!("One-hot '{}': {} categories", col, categories.len());
                Ok(OneHotColumn {
                    column: col.to_string(),
                    categories: categories.into_iter().collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[OneHotColumn] {
        &self.columns
    }

    /// Total number of indicator features produced.
    pub fn n_features(&self) -> usize {
        self.columns.iter().map(|c| c.categories.len()).sum()
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(|c| c.feature_names())
            .collect()
    }

    /// Encode `df` into a dense `(rows, n_features)` indicator matrix.
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let names: Vec<&str> = self.columns.iter().map(|c| c.column.as_str()).collect();
        require_columns(df, &names, "one-hot transform")?;

        let mut out = Array2::<f64>::zeros((df.height(), self.n_features()));
        let mut offset = 0;

        for encoded in &self.columns {
            let values = string_values(df, &encoded.column)?;
            let mut unseen = 0usize;

            for (row, value) in values.iter().enumerate() {
                match value.as_deref().and_then(|v| encoded.position(v)) {
                    Some(pos) => out[[row, offset + pos]] = 1.0,
                    None => unseen += 1,
                }
            }

            if unseen > 0 {
                warn!(
                    "Column '{}' has {} row(s) with categories unseen during fit; encoded as all zeros",
                    encoded.column, unseen
                );
            }
            offset += encoded.categories.len();
        }

        Ok(out)
    }
}

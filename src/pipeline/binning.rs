//! Feature binning for the customer table
//!
//! Converts the four continuous columns (Age, CreditScore, Tenure, Balance) into
//! discrete buckets. Age, CreditScore and Tenure use fixed, domain-defined edges;
//! Balance uses quartile edges learned from the training partition.
//!
//! Binning is a two-phase protocol: [`FeatureBinner::fit`] learns an immutable
//! [`BinningState`] from training data, and [`BinningState::transform`] applies
//! that state to any partition. The state is never recomputed at transform time,
//! so validation and test data are bucketed with the training boundaries.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::{PrepError, Result};
use super::schema::{
    bin_column_name, numeric_values, require_columns, string_values, AGE, BALANCE,
    BINNED_COLUMNS, CATEGORICAL_COLUMNS, CREDIT_SCORE, TENURE,
};

/// Code assigned to a categorical value that was not seen during fit
pub const UNKNOWN_CATEGORY_CODE: i32 = -1;

/// Quantiles of Balance learned at fit time (min is added separately)
const BALANCE_QUANTILES: [f64; 3] = [0.25, 0.5, 0.75];

/// How bucketed features are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOutput {
    /// Human-readable string labels, meant for a downstream one-hot encoder
    #[default]
    Label,
    /// Rank-ordered integers (0 = lowest/worst), with label-encoded categoricals
    Ordinal,
}

impl fmt::Display for BinOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinOutput::Label => write!(f, "label"),
            BinOutput::Ordinal => write!(f, "ordinal"),
        }
    }
}

impl std::str::FromStr for BinOutput {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "label" => Ok(BinOutput::Label),
            "ordinal" => Ok(BinOutput::Ordinal),
            _ => Err(format!("Unknown bin output: '{}'. Use 'label' or 'ordinal'.", s)),
        }
    }
}

/// Fixed right-closed buckets for one column.
///
/// `cuts` are the interior edges only: the lowest bucket is open towards -inf
/// and the highest towards +inf, so every non-NaN value lands in exactly one
/// bucket.
#[derive(Debug, Clone, Copy)]
pub struct FixedBins {
    pub column: &'static str,
    pub cuts: &'static [f64],
    pub labels: &'static [&'static str],
}

impl FixedBins {
    /// Bucket index for `value`, or `None` for NaN.
    pub fn bucket(&self, value: f64) -> Option<usize> {
        if value.is_nan() {
            return None;
        }
        // Right-closed: a value equal to a cut belongs to the bucket below it
        Some(self.cuts.partition_point(|&c| c < value))
    }
}

/// Age in years: 0,20,30,40,50,60,200
pub const AGE_BINS: FixedBins = FixedBins {
    column: AGE,
    cuts: &[20.0, 30.0, 40.0, 50.0, 60.0],
    labels: &["<20", "20-30", "31-40", "41-50", "51-60", ">60"],
};

/// Credit score risk grades, worst to best: 0,615,645,665,680,698,724,752,900
pub const CREDIT_SCORE_BINS: FixedBins = FixedBins {
    column: CREDIT_SCORE,
    cuts: &[615.0, 645.0, 665.0, 680.0, 698.0, 724.0, 752.0],
    labels: &["HH", "GG", "FF", "EE", "DD", "CC", "BB", "AA"],
};

/// Tenure segments in years: -1,2,5,10,20
pub const TENURE_BINS: FixedBins = FixedBins {
    column: TENURE,
    cuts: &[2.0, 5.0, 10.0],
    labels: &[
        "New/At-Risk",
        "Emerging Loyalty",
        "Established/Loyal",
        "Long-Term",
    ],
};

/// Balance boundaries learned from training data.
///
/// The full boundary sequence is `[min, q1, q2, q3, +inf]`; only the finite part
/// is stored so the state round-trips through JSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceBoundaries {
    pub min: f64,
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
}

impl BalanceBoundaries {
    /// Learn boundaries from Balance values, ignoring nulls and non-finite values.
    pub fn from_values(values: &[Option<f64>]) -> Result<Self> {
        let mut sorted: Vec<f64> = values
            .iter()
            .filter_map(|v| *v)
            .filter(|v| v.is_finite())
            .collect();

        if sorted.is_empty() {
            return Err(PrepError::NoValidValues(BALANCE.to_string()));
        }

        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let [q1, q2, q3] = BALANCE_QUANTILES.map(|q| quantile_sorted(&sorted, q));

        Ok(Self {
            min: sorted[0],
            q1,
            q2,
            q3,
        })
    }

    /// The boundary sequence `[min, q1, q2, q3, +inf]`, duplicates included.
    pub fn edges(&self) -> [f64; 5] {
        [self.min, self.q1, self.q2, self.q3, f64::INFINITY]
    }

    /// Boundaries with duplicates collapsed, as used for bucketing.
    pub fn unique_edges(&self) -> Vec<f64> {
        let mut edges = self.edges().to_vec();
        edges.dedup();
        edges
    }

    /// Number of Balance buckets after collapsing duplicate boundaries.
    pub fn bucket_count(&self) -> usize {
        self.unique_edges().len() - 1
    }

    /// Labels sized to the bucket count.
    pub fn labels(&self) -> Vec<String> {
        balance_labels(self.bucket_count())
    }

    /// Bucket index for `value` against collapsed `edges`.
    ///
    /// Intervals are right-closed with the lowest boundary inclusive. Values
    /// below the training minimum, and NaN, have no bucket.
    pub fn bucket(edges: &[f64], value: f64) -> Option<usize> {
        let n_buckets = edges.len().saturating_sub(1);
        let j = edges.partition_point(|&e| e < value);
        if j == 0 {
            (n_buckets > 0 && value == edges[0]).then_some(0)
        } else if j <= n_buckets {
            Some(j - 1)
        } else {
            None
        }
    }
}

/// Balance labels for `n` buckets.
fn balance_labels(n: usize) -> Vec<String> {
    let fixed: &[&str] = match n {
        4 => &["Q1-Low", "Q2-Medium-Low", "Q3-Medium-High", "Q4-High"],
        3 => &["Low", "Medium", "High"],
        2 => &["Low", "High"],
        _ => &[],
    };
    if fixed.is_empty() {
        (1..=n).map(|i| format!("Q{}", i)).collect()
    } else {
        fixed.iter().map(|s| s.to_string()).collect()
    }
}

/// Quantile of sorted data with linear interpolation between order statistics.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Label mapping for one categorical column: sorted unique training values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCodes {
    pub column: String,
    pub categories: Vec<String>,
}

impl CategoryCodes {
    fn fit(column: &str, values: &[Option<String>]) -> Self {
        let categories: BTreeSet<&str> = values.iter().flatten().map(String::as_str).collect();
        Self {
            column: column.to_string(),
            categories: categories.into_iter().map(str::to_string).collect(),
        }
    }

    /// Code of `value`, or `None` if it was not seen during fit.
    pub fn code(&self, value: &str) -> Option<i32> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
            .map(|i| i as i32)
    }
}

/// Binning configuration. Call [`fit`](Self::fit) to obtain a [`BinningState`].
#[derive(Debug, Clone)]
pub struct FeatureBinner {
    output: BinOutput,
    categorical_columns: Vec<String>,
}

impl FeatureBinner {
    pub fn new(output: BinOutput) -> Self {
        Self {
            output,
            categorical_columns: CATEGORICAL_COLUMNS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Categorical label-encoding binner for tree models
    pub fn ordinal() -> Self {
        Self::new(BinOutput::Ordinal)
    }

    /// String-label binner for one-hot pipelines
    pub fn labels() -> Self {
        Self::new(BinOutput::Label)
    }

    /// Override the categorical columns label-encoded in ordinal mode.
    pub fn with_categorical_columns<S: Into<String>>(
        mut self,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.categorical_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn output(&self) -> BinOutput {
        self.output
    }

    /// Columns that must be present at fit and transform time.
    pub fn required_columns(&self) -> Vec<String> {
        let mut required: Vec<String> = BINNED_COLUMNS.iter().map(|s| s.to_string()).collect();
        if self.output == BinOutput::Ordinal {
            required.extend(self.categorical_columns.iter().cloned());
        }
        required
    }

    /// Learn Balance boundaries (and categorical codes in ordinal mode) from
    /// the training partition.
    pub fn fit(&self, df: &DataFrame) -> Result<BinningState> {
        debug!(
            "Fitting {} binner on {} rows - learning Balance quantiles",
            self.output,
            df.height()
        );
        require_columns(df, &self.required_columns(), "binning fit")?;

        let balance = BalanceBoundaries::from_values(&numeric_values(df, BALANCE)?)?;
        debug!("Balance boundaries learned: {:?}", balance.edges());

        let category_codes = match self.output {
            BinOutput::Label => Vec::new(),
            BinOutput::Ordinal => self
                .categorical_columns
                .iter()
                .map(|col| {
                    let codes = CategoryCodes::fit(col, &string_values(df, col)?);
                    debug!("Label mapping for '{}': {:?}", col, codes.categories);
                    Ok(codes)
                })
                .collect::<Result<Vec<_>>>()?,
        };

        Ok(BinningState {
            output: self.output,
            balance,
            category_codes,
        })
    }
}

/// Learned binning state. Immutable once produced by [`FeatureBinner::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinningState {
    output: BinOutput,
    balance: BalanceBoundaries,
    category_codes: Vec<CategoryCodes>,
}

impl BinningState {
    pub fn output(&self) -> BinOutput {
        self.output
    }

    pub fn balance(&self) -> &BalanceBoundaries {
        &self.balance
    }

    pub fn category_codes(&self) -> &[CategoryCodes] {
        &self.category_codes
    }

    /// Names of the appended bucket columns, in output order.
    pub fn bin_columns(&self) -> Vec<String> {
        BINNED_COLUMNS.iter().map(|c| bin_column_name(c)).collect()
    }

    /// Bucket the four numeric columns and, in ordinal mode, label-encode the
    /// categorical columns.
    ///
    /// The numeric source columns are dropped; `Age_bin`, `CreditScore_bin`,
    /// `Tenure_bin` and `Balance_bin` are appended. All other columns pass
    /// through unchanged.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        debug!("Binning transform called with shape {:?}", df.shape());

        let mut required: Vec<&str> = BINNED_COLUMNS.to_vec();
        required.extend(self.category_codes.iter().map(|c| c.column.as_str()));
        require_columns(df, &required, "binning transform")?;

        let mut bin_columns = Vec::with_capacity(BINNED_COLUMNS.len());
        for bins in [AGE_BINS, CREDIT_SCORE_BINS, TENURE_BINS] {
            let values = numeric_values(df, bins.column)?;
            let buckets = assign_buckets(bins.column, &values, |v| bins.bucket(v))?;
            bin_columns.push(self.render(bins.column, &buckets, bins.labels));
        }

        let edges = self.balance.unique_edges();
        let labels = self.balance.labels();
        let label_refs: Vec<&str> = labels.iter().map(String::as_str).collect();
        debug!(
            "Using {} unique Balance boundaries with {} labels",
            edges.len(),
            labels.len()
        );
        let values = numeric_values(df, BALANCE)?;
        let buckets = assign_buckets(BALANCE, &values, |v| BalanceBoundaries::bucket(&edges, v))?;
        bin_columns.push(self.render(BALANCE, &buckets, &label_refs));

        let mut out = df.drop_many(BINNED_COLUMNS);

        for codes in &self.category_codes {
            let encoded = encode_categories(codes, &string_values(df, &codes.column)?);
            out.with_column(Column::new(codes.column.as_str().into(), encoded))?;
        }

        for column in bin_columns {
            out.with_column(column)?;
        }

        debug!("Binning transform completed. Output shape: {:?}", out.shape());
        Ok(out)
    }

    fn render(&self, source: &str, buckets: &[usize], labels: &[&str]) -> Column {
        let name: PlSmallStr = bin_column_name(source).into();
        match self.output {
            BinOutput::Label => {
                let rendered: Vec<&str> = buckets.iter().map(|&b| labels[b]).collect();
                Column::new(name, rendered)
            }
            BinOutput::Ordinal => {
                let ranks: Vec<i32> = buckets.iter().map(|&b| b as i32).collect();
                Column::new(name, ranks)
            }
        }
    }
}

/// Assign a bucket to every value, failing with every offending value listed.
fn assign_buckets(
    column: &str,
    values: &[Option<f64>],
    bucket: impl Fn(f64) -> Option<usize>,
) -> Result<Vec<usize>> {
    let mut buckets = Vec::with_capacity(values.len());
    let mut invalid: BTreeSet<String> = BTreeSet::new();

    for value in values {
        match value.and_then(&bucket) {
            Some(b) => buckets.push(b),
            None => {
                invalid.insert(value.map_or_else(|| "null".to_string(), |v| v.to_string()));
            }
        }
    }

    if !invalid.is_empty() {
        let values: Vec<String> = invalid.into_iter().collect();
        tracing::error!("Invalid {} values found (outside bins): {:?}", column, values);
        return Err(PrepError::Range {
            column: column.to_string(),
            values,
        });
    }

    if tracing::enabled!(tracing::Level::DEBUG) {
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for &b in &buckets {
            *counts.entry(b).or_insert(0) += 1;
        }
        debug!("{} binning successful. Distribution: {:?}", column, counts);
    }

    Ok(buckets)
}

/// Label-encode one categorical column, mapping unseen values to the sentinel.
fn encode_categories(codes: &CategoryCodes, values: &[Option<String>]) -> Vec<i32> {
    let mut unseen: BTreeSet<&str> = BTreeSet::new();
    let mut unseen_rows = 0usize;

    let encoded: Vec<i32> = values
        .iter()
        .map(|v| match v.as_deref().and_then(|s| codes.code(s)) {
            Some(code) => code,
            None => {
                unseen_rows += 1;
                unseen.insert(v.as_deref().unwrap_or("null"));
                UNKNOWN_CATEGORY_CODE
            }
        })
        .collect();

    if unseen_rows > 0 {
        warn!(
            "Column '{}' has {} row(s) with categories unseen during fit {:?}; encoded as {}",
            codes.column, unseen_rows, unseen, UNKNOWN_CATEGORY_CODE
        );
    }

    encoded
}

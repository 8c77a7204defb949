//! Preprocessing pipelines per model family
//!
//! A [`PreprocessPipeline`] composes the binning stage with the encoding that
//! suits a model family and turns a customer frame into a dense numeric
//! [`FeatureMatrix`]:
//!
//! - [`ModelFamily::Linear`]: label binning followed by one-hot encoding of the
//!   native and derived categorical columns, then the passthrough numerics.
//! - [`ModelFamily::Tree`]: ordinal binning with label-encoded categoricals.
//!
//! Any column that is neither binned, categorical nor passthrough is dropped.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ndarray::{concatenate, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::binning::{BinOutput, BinningState, FeatureBinner};
use super::encoding::OneHotEncoder;
use super::error::{PrepError, Result};
use super::schema::{
    numeric_values, require_columns, BINNED_COLUMNS, CATEGORICAL_COLUMNS, PASSTHROUGH_COLUMNS,
};

/// Downstream model family, which decides how features are encoded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    /// Linear models (logistic regression): one-hot encoded bins
    #[default]
    Linear,
    /// Tree ensembles (gradient boosting): ordinal bins and label codes
    Tree,
}

impl ModelFamily {
    pub fn bin_output(&self) -> BinOutput {
        match self {
            ModelFamily::Linear => BinOutput::Label,
            ModelFamily::Tree => BinOutput::Ordinal,
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFamily::Linear => write!(f, "linear"),
            ModelFamily::Tree => write!(f, "tree"),
        }
    }
}

impl std::str::FromStr for ModelFamily {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" | "logistic" | "onehot" | "one-hot" => Ok(ModelFamily::Linear),
            "tree" | "xgboost" | "ordinal" => Ok(ModelFamily::Tree),
            _ => Err(format!(
                "Unknown model family: '{}'. Use 'linear' or 'tree'.",
                s
            )),
        }
    }
}

/// Dense model input with named columns
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub feature_names: Vec<String>,
    pub values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn new(feature_names: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if feature_names.len() != values.ncols() {
            return Err(PrepError::invalid_parameter(
                "feature_names",
                format!(
                    "{} names for {} matrix columns",
                    feature_names.len(),
                    values.ncols()
                ),
            ));
        }
        Ok(Self {
            feature_names,
            values,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }

    /// Convert into a polars frame with one `f64` column per feature.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let columns: Vec<Column> = self
            .feature_names
            .iter()
            .zip(self.values.columns())
            .map(|(name, col)| Column::new(name.as_str().into(), col.to_vec()))
            .collect();
        Ok(DataFrame::new(columns)?)
    }
}

/// State learned by [`PreprocessPipeline::fit`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedPreprocessor {
    binning: BinningState,
    onehot: Option<OneHotEncoder>,
    feature_names: Vec<String>,
}

/// Binning plus encoding as a single fit/transform unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessPipeline {
    family: ModelFamily,
    categorical_columns: Vec<String>,
    passthrough_columns: Vec<String>,
    fitted: Option<FittedPreprocessor>,
}

impl PreprocessPipeline {
    /// Unfitted pipeline for `family` with the default categorical and
    /// passthrough columns.
    pub fn build(family: ModelFamily) -> Self {
        Self {
            family,
            categorical_columns: CATEGORICAL_COLUMNS.iter().map(|s| s.to_string()).collect(),
            passthrough_columns: PASSTHROUGH_COLUMNS.iter().map(|s| s.to_string()).collect(),
            fitted: None,
        }
    }

    /// Replace the native categorical columns: one-hot encoded for linear
    /// models, label-encoded for trees.
    pub fn with_categorical_columns<S: Into<String>>(
        mut self,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.categorical_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the numeric columns that pass through unbinned.
    pub fn with_passthrough_columns<S: Into<String>>(
        mut self,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.passthrough_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical_columns
    }

    pub fn passthrough_columns(&self) -> &[String] {
        &self.passthrough_columns
    }

    /// Learned binning state, if fitted.
    pub fn binning_state(&self) -> Option<&BinningState> {
        self.fitted.as_ref().map(|f| &f.binning)
    }

    fn required_columns(&self) -> Vec<&str> {
        let mut required: Vec<&str> = BINNED_COLUMNS.to_vec();
        required.extend(self.categorical_columns.iter().map(String::as_str));
        required.extend(self.passthrough_columns.iter().map(String::as_str));
        required
    }

    fn fitted(&self) -> Result<&FittedPreprocessor> {
        self.fitted.as_ref().ok_or_else(|| PrepError::NotFitted {
            component: format!("{} preprocessing pipeline", self.family),
        })
    }

    /// Fit every stage on the training partition. Refitting replaces prior state.
    pub fn fit(&mut self, train: &DataFrame) -> Result<&mut Self> {
        info!(
            "Fitting {} preprocessing pipeline on {} rows",
            self.family,
            train.height()
        );
        require_columns(train, &self.required_columns(), "preprocessing fit")?;

        let binning = FeatureBinner::new(self.family.bin_output())
            .with_categorical_columns(self.categorical_columns.iter().cloned())
            .fit(train)?;

        let (onehot, feature_names) = match self.family {
            ModelFamily::Linear => {
                let binned = binning.transform(train)?;
                let mut encoded_columns = self.categorical_columns.clone();
                encoded_columns.extend(binning.bin_columns());
                let encoder = OneHotEncoder::fit(&binned, &encoded_columns)?;
                let mut names = encoder.feature_names();
                names.extend(self.passthrough_columns.iter().cloned());
                (Some(encoder), names)
            }
            ModelFamily::Tree => (None, self.ordinal_columns(&binning)),
        };

        debug!("Pipeline produces {} features", feature_names.len());
        self.fitted = Some(FittedPreprocessor {
            binning,
            onehot,
            feature_names,
        });
        Ok(self)
    }

    /// Apply the learned state. Never mutates the pipeline.
    pub fn transform(&self, df: &DataFrame) -> Result<FeatureMatrix> {
        let fitted = self.fitted()?;
        require_columns(df, &self.required_columns(), "preprocessing transform")?;

        let binned = fitted.binning.transform(df)?;

        let values = match &fitted.onehot {
            Some(encoder) => {
                let indicators = encoder.transform(&binned)?;
                let numeric = dense_columns(&binned, &self.passthrough_columns)?;
                concatenate(Axis(1), &[indicators.view(), numeric.view()])?
            }
            None => dense_columns(&binned, &fitted.feature_names)?,
        };

        FeatureMatrix::new(fitted.feature_names.clone(), values)
    }

    pub fn fit_transform(&mut self, train: &DataFrame) -> Result<FeatureMatrix> {
        self.fit(train)?;
        self.transform(train)
    }

    /// Output column names, in matrix order.
    pub fn feature_names(&self) -> Result<&[String]> {
        Ok(&self.fitted()?.feature_names)
    }

    fn ordinal_columns(&self, binning: &BinningState) -> Vec<String> {
        let mut names = self.passthrough_columns.clone();
        names.extend(self.categorical_columns.iter().cloned());
        names.extend(binning.bin_columns());
        names
    }

    /// Serialize the fitted pipeline as JSON.
    pub fn to_json(&self) -> Result<String> {
        self.fitted()?;
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the fitted pipeline to `path` as JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        self.fitted()?;
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Load a pipeline written by [`save_json`](Self::save_json).
    pub fn load_json(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Stack numeric columns into a matrix, rejecting nulls and NaN.
fn dense_columns(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let mut out = Array2::<f64>::zeros((df.height(), columns.len()));

    for (j, col) in columns.iter().enumerate() {
        let values = numeric_values(df, col)?;
        let mut has_missing = false;
        for (i, v) in values.into_iter().enumerate() {
            match v {
                Some(x) if !x.is_nan() => out[[i, j]] = x,
                _ => has_missing = true,
            }
        }
        if has_missing {
            return Err(PrepError::Range {
                column: col.clone(),
                values: vec!["null".to_string()],
            });
        }
    }

    Ok(out)
}

//! Error types for the preparation pipeline.
//!
//! Structural problems (missing columns, unfitted state, out-of-range values,
//! resampling preconditions) are fatal and surface as [`PrepError`]. Unknown
//! categories and unknown strategy names are not errors: they are logged at
//! warn level and replaced with a documented default.

use thiserror::Error;

/// Errors raised by binning, encoding, splitting, weighting and resampling.
#[derive(Error, Debug)]
pub enum PrepError {
    /// One or more required columns are absent from the frame.
    #[error("Missing required columns for {stage}: {columns:?}")]
    Schema {
        /// Pipeline stage that performed the check (e.g. "binning fit")
        stage: String,
        /// Every column that was expected but not found
        columns: Vec<String>,
    },

    /// Values could not be placed in any bucket of a binned column.
    #[error("Invalid {column} values found (outside bins): {values:?}")]
    Range {
        /// Column being binned
        column: String,
        /// Distinct offending values, rendered for display (nulls as "null")
        values: Vec<String>,
    },

    /// `transform` was called before `fit`.
    #[error("{component} is not fitted; call fit() on training data first")]
    NotFitted {
        /// Name of the component that has no learned state
        component: String,
    },

    /// A synthetic resampler cannot find enough same-class neighbours.
    #[error(
        "{method} needs at least {required} samples of class {class} to interpolate, found {available}"
    )]
    InsufficientSamples {
        method: String,
        class: i32,
        available: usize,
        required: usize,
    },

    /// ADASYN found no minority sample with an opposite-class neighbour.
    #[error("{method} found no neighbours from other classes around class {class}; nothing to adapt to")]
    NoHardExamples { method: String, class: i32 },

    /// A label is missing or not 0/1.
    #[error("Label column '{column}' must be binary (0/1): row {row} has {value}")]
    InvalidLabel {
        column: String,
        row: usize,
        value: String,
    },

    /// A numeric column has no usable (non-null, non-NaN) values.
    #[error("No valid values found in column '{0}'")]
    NoValidValues(String),

    /// A caller-supplied parameter is outside its valid range.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Matrix shape mismatch.
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PrepError {
    /// Build a schema error for `stage` listing the missing `columns`.
    pub fn missing_columns<S: Into<String>>(stage: &str, columns: impl IntoIterator<Item = S>) -> Self {
        PrepError::Schema {
            stage: stage.to_string(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Build an invalid-parameter error.
    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        PrepError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias used across the pipeline.
pub type Result<T> = std::result::Result<T, PrepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_names_every_column() {
        let err = PrepError::missing_columns("binning fit", ["Age", "Balance"]);
        let msg = err.to_string();
        assert!(msg.contains("binning fit"));
        assert!(msg.contains("Age"));
        assert!(msg.contains("Balance"));
    }

    #[test]
    fn test_range_error_names_column_and_values() {
        let err = PrepError::Range {
            column: "Balance".to_string(),
            values: vec!["-5".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Balance"));
        assert!(msg.contains("-5"));
    }

    #[test]
    fn test_insufficient_samples_message() {
        let err = PrepError::InsufficientSamples {
            method: "SMOTE".to_string(),
            class: 1,
            available: 3,
            required: 6,
        };
        let msg = err.to_string();
        assert!(msg.contains("SMOTE"));
        assert!(msg.contains("class 1"));
        assert!(msg.contains('3'));
        assert!(msg.contains('6'));
    }
}

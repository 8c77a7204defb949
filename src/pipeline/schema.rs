//! Column names of the customer table and typed column access helpers

use polars::prelude::*;

use super::error::{PrepError, Result};

pub const AGE: &str = "Age";
pub const CREDIT_SCORE: &str = "CreditScore";
pub const TENURE: &str = "Tenure";
pub const BALANCE: &str = "Balance";
pub const GEOGRAPHY: &str = "Geography";
pub const GENDER: &str = "Gender";
pub const TARGET: &str = "Exited";

/// Numeric columns replaced by bucketed features during binning
pub const BINNED_COLUMNS: [&str; 4] = [AGE, CREDIT_SCORE, TENURE, BALANCE];

/// Native categorical columns
pub const CATEGORICAL_COLUMNS: [&str; 2] = [GEOGRAPHY, GENDER];

/// Numeric modeling columns that are never binned
pub const PASSTHROUGH_COLUMNS: [&str; 4] = [
    "NumOfProducts",
    "HasCrCard",
    "IsActiveMember",
    "EstimatedSalary",
];

/// Identifier columns excluded from modeling
pub const IDENTIFIER_COLUMNS: [&str; 3] = ["RowNumber", "CustomerId", "Surname"];

/// Name of the bucketed column derived from `source`
pub fn bin_column_name(source: &str) -> String {
    format!("{}_bin", source)
}

/// Fail with a schema error listing every column of `required` absent from `df`.
pub fn require_columns<S: AsRef<str>>(df: &DataFrame, required: &[S], stage: &str) -> Result<()> {
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let missing: Vec<String> = required
        .iter()
        .map(|c| c.as_ref())
        .filter(|c| !present.iter().any(|p| p == c))
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        tracing::error!("Missing required columns for {}: {:?}", stage, missing);
        Err(PrepError::missing_columns(stage, missing))
    }
}

/// Read a column as `f64` values, keeping nulls as `None`.
pub fn numeric_values(df: &DataFrame, col_name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(col_name)?;
    let float_col = column.cast(&DataType::Float64)?;
    Ok(float_col.f64()?.into_iter().collect())
}

/// Read a column as strings, keeping nulls as `None`.
///
/// Numeric and boolean columns are rendered with their display form so that
/// an integer-coded category still encodes consistently.
pub fn string_values(df: &DataFrame, col_name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(col_name)?;

    let values: Vec<Option<String>> = match column.dtype() {
        DataType::String => column
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            let cast = column.cast(&DataType::Int64)?;
            cast.i64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::Float32 | DataType::Float64 => {
            let cast = column.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| v.map(|n| format!("{}", n)))
                .collect()
        }
        _ => {
            let cast = column.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.map(|s| s.to_string()))
                .collect()
        }
    };

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_columns_lists_all_missing() {
        let df = df! { "Age" => [30.0f64] }.unwrap();
        let err = require_columns(&df, &BINNED_COLUMNS, "binning transform").unwrap_err();
        match err {
            PrepError::Schema { columns, .. } => {
                assert_eq!(columns, vec!["CreditScore", "Tenure", "Balance"]);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_string_values_from_integer_column() {
        let df = df! { "code" => [Some(1i32), None, Some(3)] }.unwrap();
        let values = string_values(&df, "code").unwrap();
        assert_eq!(values, vec![Some("1".to_string()), None, Some("3".to_string())]);
    }

    #[test]
    fn test_numeric_values_casts_integers() {
        let df = df! { "Tenure" => [1i64, 2, 3] }.unwrap();
        let values = numeric_values(&df, "Tenure").unwrap();
        assert_eq!(values, vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_bin_column_name() {
        assert_eq!(bin_column_name("Balance"), "Balance_bin");
    }
}

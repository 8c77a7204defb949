//! Integration tests for the preprocessing pipeline per model family

mod common;

use churnprep::pipeline::{
    prepare_frame, ExperimentConfig, ModelFamily, PrepError, PreprocessPipeline,
};
use common::{create_churn_frame, create_small_customer_frame};
use polars::prelude::*;

fn modeling_frame(df: &DataFrame) -> DataFrame {
    prepare_frame(df, &ExperimentConfig::default()).unwrap().frame
}

#[test]
fn test_linear_pipeline_one_hot_layout() {
    let df = modeling_frame(&create_small_customer_frame());
    let mut pipeline = PreprocessPipeline::build(ModelFamily::Linear);
    let matrix = pipeline.fit_transform(&df).unwrap();

    let names = &matrix.feature_names;
    assert!(names.contains(&"Geography_France".to_string()));
    assert!(names.contains(&"Age_bin_41-50".to_string()));
    assert_eq!(&names[names.len() - 4..], ["NumOfProducts", "HasCrCard", "IsActiveMember", "EstimatedSalary"]);

    // Every categorical block is exactly one-hot per row
    let geo_idx: Vec<usize> = names
        .iter()
        .enumerate()
        .filter(|(_, n)| n.starts_with("Geography_"))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(geo_idx.len(), 3);
    for row in matrix.values.rows() {
        let total: f64 = geo_idx.iter().map(|&i| row[i]).sum();
        assert_eq!(total, 1.0);
    }
    assert_eq!(matrix.n_rows(), 8);
}

#[test]
fn test_tree_pipeline_ordinal_layout() {
    let df = modeling_frame(&create_small_customer_frame());
    let mut pipeline = PreprocessPipeline::build(ModelFamily::Tree);
    let matrix = pipeline.fit_transform(&df).unwrap();

    assert_eq!(
        matrix.feature_names,
        vec![
            "NumOfProducts",
            "HasCrCard",
            "IsActiveMember",
            "EstimatedSalary",
            "Geography",
            "Gender",
            "Age_bin",
            "CreditScore_bin",
            "Tenure_bin",
            "Balance_bin",
        ]
    );
    assert_eq!(matrix.n_features(), 10);
    // Last customer: Germany (1), Female (0), age 29 -> bucket 1
    let last = matrix.values.row(7);
    assert_eq!(last[4], 1.0);
    assert_eq!(last[5], 0.0);
    assert_eq!(last[6], 1.0);
}

#[test]
fn test_transform_before_fit_fails() {
    let df = modeling_frame(&create_small_customer_frame());
    let pipeline = PreprocessPipeline::build(ModelFamily::Linear);
    assert!(matches!(
        pipeline.transform(&df),
        Err(PrepError::NotFitted { .. })
    ));
    assert!(pipeline.feature_names().is_err());
}

#[test]
fn test_unseen_category_encodes_as_zeros() {
    let train = modeling_frame(&create_small_customer_frame());
    let mut pipeline = PreprocessPipeline::build(ModelFamily::Linear);
    pipeline.fit(&train).unwrap();

    let mut rows = train.head(Some(1));
    rows.with_column(Column::new("Geography".into(), ["Italy"]))
        .unwrap();
    let matrix = pipeline.transform(&rows).unwrap();

    let names = pipeline.feature_names().unwrap();
    for (i, name) in names.iter().enumerate() {
        if name.starts_with("Geography_") {
            assert_eq!(matrix.values[[0, i]], 0.0);
        }
    }
}

#[test]
fn test_saved_pipeline_reproduces_transform() {
    let df = modeling_frame(&create_churn_frame(400, 21));
    for family in [ModelFamily::Linear, ModelFamily::Tree] {
        let mut pipeline = PreprocessPipeline::build(family);
        let expected = pipeline.fit_transform(&df).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preprocessor.json");
        pipeline.save_json(&path).unwrap();

        let restored = PreprocessPipeline::load_json(&path).unwrap();
        assert_eq!(restored.family(), family);
        let actual = restored.transform(&df).unwrap();
        assert_eq!(actual, expected);
    }
}

#[test]
fn test_saving_unfitted_pipeline_fails() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = PreprocessPipeline::build(ModelFamily::Tree);
    assert!(pipeline.save_json(&dir.path().join("p.json")).is_err());
}

//! Tests for CLI parsing and end-to-end binary runs

mod common;

use std::io::Write;

use assert_cmd::Command;
use churnprep::cli::{Cli, Commands};
use churnprep::pipeline::{ModelFamily, PreprocessPipeline};
use clap::Parser;
use common::{create_churn_frame, create_temp_csv};
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_prepare_defaults() {
    let cli = Cli::parse_from(["churnprep", "prepare", "-i", "data.csv"]);
    assert!(!cli.verbose);
    let Commands::Prepare(args) = cli.command else {
        panic!("expected prepare");
    };
    let config = args.resolve_config().unwrap();
    assert_eq!(config.family, ModelFamily::Linear);
    assert_eq!(config.resampling, "none");
    assert_eq!(config.cost_ratio, 10.0);
}

#[test]
fn test_invalid_fraction_is_rejected_by_parser() {
    let result = Cli::try_parse_from(["churnprep", "prepare", "-i", "d.csv", "--test-size", "1.5"]);
    assert!(result.is_err());
}

#[test]
fn test_prepare_writes_artifacts() {
    let mut df = create_churn_frame(600, 42);
    let (_dir, csv_path) = create_temp_csv(&mut df);
    let out = TempDir::new().unwrap();

    Command::cargo_bin("churnprep")
        .unwrap()
        .args(["prepare", "-i"])
        .arg(&csv_path)
        .arg("-o")
        .arg(out.path())
        .args(["--family", "tree", "--resampling", "smote", "--weighting", "balanced"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PREPARATION SUMMARY"));

    for file in ["preprocessor.json", "metadata.json", "train.csv", "validation.csv", "test.csv"] {
        assert!(out.path().join(file).exists(), "{file} was not written");
    }

    let pipeline = PreprocessPipeline::load_json(&out.path().join("preprocessor.json")).unwrap();
    assert_eq!(pipeline.family(), ModelFamily::Tree);
    assert!(pipeline.is_fitted());

    let train_csv = std::fs::read_to_string(out.path().join("train.csv")).unwrap();
    let header = train_csv.lines().next().unwrap();
    assert!(header.ends_with("label,sample_weight"));

    let metadata: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(out.path().join("metadata.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(metadata["config"]["family"], "tree");
    assert_eq!(metadata["feature_names"].as_array().unwrap().len(), 10);
}

#[test]
fn test_prepare_missing_input_fails() {
    let out = TempDir::new().unwrap();
    Command::cargo_bin("churnprep")
        .unwrap()
        .args(["prepare", "-i", "/nonexistent/churn.csv", "-o"])
        .arg(out.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("churn.csv"));
}

#[test]
fn test_evaluate_writes_threshold_results() {
    let dir = TempDir::new().unwrap();
    let predictions = dir.path().join("preds.csv");
    let mut file = std::fs::File::create(&predictions).unwrap();
    writeln!(file, "label,score").unwrap();
    for (label, score) in [(0, 0.05), (0, 0.2), (0, 0.4), (0, 0.7), (1, 0.3), (1, 0.6), (1, 0.9)] {
        writeln!(file, "{},{}", label, score).unwrap();
    }
    drop(file);

    Command::cargo_bin("churnprep")
        .unwrap()
        .args(["evaluate", "-p"])
        .arg(&predictions)
        .assert()
        .success()
        .stdout(predicate::str::contains("THRESHOLD SUMMARY"));

    let output = dir.path().join("preds_thresholds.json");
    let results: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output).unwrap()).unwrap();
    assert_eq!(results["thresholds"].as_array().unwrap().len(), 18);
    assert_eq!(results["summary"]["best_recall"]["recall"], 1.0);
}

#[test]
fn test_evaluate_missing_score_column_fails() {
    let dir = TempDir::new().unwrap();
    let predictions = dir.path().join("preds.csv");
    std::fs::write(&predictions, "label,prob\n0,0.1\n1,0.8\n").unwrap();

    Command::cargo_bin("churnprep")
        .unwrap()
        .args(["evaluate", "-p"])
        .arg(&predictions)
        .assert()
        .failure()
        .stderr(predicate::str::contains("score"));
}

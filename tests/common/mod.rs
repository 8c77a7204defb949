//! Shared test utilities and fixture generators

#![allow(dead_code)]

use std::path::PathBuf;

use churnprep::pipeline::{Classifier, Result as PrepResult};
use ndarray::Array2;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

/// Small hand-written customer table with every bin boundary case
pub fn create_small_customer_frame() -> DataFrame {
    df! {
        "RowNumber" => [1i64, 2, 3, 4, 5, 6, 7, 8],
        "CustomerId" => [101i64, 102, 103, 104, 105, 106, 107, 108],
        "Surname" => ["Hargrave", "Hill", "Onio", "Boni", "Mitchell", "Chu", "Bartlett", "Obinna"],
        "CreditScore" => [619i64, 608, 502, 699, 850, 645, 822, 376],
        "Geography" => ["France", "Spain", "France", "France", "Spain", "Spain", "France", "Germany"],
        "Gender" => ["Female", "Female", "Female", "Female", "Female", "Male", "Male", "Female"],
        "Age" => [42i64, 41, 42, 39, 43, 44, 50, 29],
        "Tenure" => [2i64, 1, 8, 1, 2, 8, 7, 4],
        "Balance" => [0.0f64, 83807.86, 159660.8, 0.0, 125510.82, 113755.78, 0.0, 115046.74],
        "NumOfProducts" => [1i64, 1, 3, 2, 1, 2, 2, 4],
        "HasCrCard" => [1i64, 0, 1, 0, 1, 1, 1, 1],
        "IsActiveMember" => [1i64, 1, 0, 0, 1, 0, 1, 0],
        "EstimatedSalary" => [101348.88f64, 112542.58, 113931.57, 93826.63, 79084.1, 149756.71, 10062.8, 119346.88],
        "Exited" => [1i64, 0, 1, 0, 0, 1, 0, 1],
    }
    .unwrap()
}

/// Synthetic customer table shaped like the bank churn data.
///
/// Churn probability rises with age, inactivity and German residence, giving
/// an overall churn rate of roughly 20%. Deterministic for a given seed.
pub fn create_churn_frame(rows: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let geographies = ["France", "Germany", "Spain"];
    let genders = ["Male", "Female"];

    let mut credit = Vec::with_capacity(rows);
    let mut geography = Vec::with_capacity(rows);
    let mut gender = Vec::with_capacity(rows);
    let mut age = Vec::with_capacity(rows);
    let mut tenure = Vec::with_capacity(rows);
    let mut balance = Vec::with_capacity(rows);
    let mut products = Vec::with_capacity(rows);
    let mut has_card = Vec::with_capacity(rows);
    let mut active = Vec::with_capacity(rows);
    let mut salary = Vec::with_capacity(rows);
    let mut exited = Vec::with_capacity(rows);

    for _ in 0..rows {
        let geo = geographies[rng.gen_range(0..3)];
        let a: i64 = rng.gen_range(18..=92);
        let is_active: i64 = rng.gen_range(0..=1);

        let mut p = 0.06;
        if a > 45 {
            p += 0.25;
        }
        if is_active == 0 {
            p += 0.10;
        }
        if geo == "Germany" {
            p += 0.08;
        }

        credit.push(rng.gen_range(350i64..=850));
        geography.push(geo);
        gender.push(genders[rng.gen_range(0..2)]);
        age.push(a);
        tenure.push(rng.gen_range(0i64..=10));
        balance.push(if rng.gen_bool(0.35) {
            0.0
        } else {
            rng.gen_range(20_000.0..250_000.0)
        });
        products.push(rng.gen_range(1i64..=4));
        has_card.push(rng.gen_range(0i64..=1));
        active.push(is_active);
        salary.push(rng.gen_range(10.0..200_000.0));
        exited.push(i64::from(rng.gen::<f64>() < p));
    }

    let row_number: Vec<i64> = (1..=rows as i64).collect();
    let customer_id: Vec<i64> = (0..rows as i64).map(|i| 15_600_000 + i).collect();
    let surname: Vec<String> = (0..rows).map(|i| format!("Customer{}", i)).collect();

    df! {
        "RowNumber" => row_number,
        "CustomerId" => customer_id,
        "Surname" => surname,
        "CreditScore" => credit,
        "Geography" => geography,
        "Gender" => gender,
        "Age" => age,
        "Tenure" => tenure,
        "Balance" => balance,
        "NumOfProducts" => products,
        "HasCrCard" => has_card,
        "IsActiveMember" => active,
        "EstimatedSalary" => salary,
        "Exited" => exited,
    }
    .unwrap()
}

/// Two overlapping uniform cubes with an 800/200 class split
pub fn create_imbalanced_matrix(seed: u64) -> (Array2<f64>, Vec<i32>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let n_major = 800;
    let n_minor = 200;
    let mut values = Vec::with_capacity((n_major + n_minor) * 3);
    let mut labels = Vec::with_capacity(n_major + n_minor);

    for i in 0..n_major + n_minor {
        let (label, centre) = if i < n_major { (0, 0.0) } else { (1, 2.0) };
        for _ in 0..3 {
            values.push(centre + rng.gen_range(-1.5..1.5));
        }
        labels.push(label);
    }

    let x = Array2::from_shape_vec((n_major + n_minor, 3), values).unwrap();
    (x, labels)
}

/// Write `df` to a CSV file in a fresh temporary directory
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("churn.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Write `df` to a Parquet file in a fresh temporary directory
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("churn.parquet");

    let mut file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Nearest-centroid classifier with a weighted class prior.
///
/// Scores are `sigmoid(prior_log_odds + (d_neg^2 - d_pos^2) / 2)`, so heavier
/// positive sample weights push every score up.
#[derive(Debug, Default, Clone)]
pub struct CentroidClassifier {
    pos: Vec<f64>,
    neg: Vec<f64>,
    log_odds: f64,
}

impl Classifier for CentroidClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[i32], sample_weight: Option<&[f64]>) -> PrepResult<()> {
        let n_features = x.ncols();
        let mut pos = vec![0.0; n_features];
        let mut neg = vec![0.0; n_features];
        let (mut w_pos, mut w_neg) = (0.0, 0.0);

        for (i, row) in x.rows().into_iter().enumerate() {
            let w = sample_weight.map_or(1.0, |sw| sw[i]);
            let (sum, total) = if y[i] == 1 {
                (&mut pos, &mut w_pos)
            } else {
                (&mut neg, &mut w_neg)
            };
            for (s, v) in sum.iter_mut().zip(row.iter()) {
                *s += w * v;
            }
            *total += w;
        }

        pos.iter_mut().for_each(|v| *v /= w_pos.max(f64::EPSILON));
        neg.iter_mut().for_each(|v| *v /= w_neg.max(f64::EPSILON));
        self.pos = pos;
        self.neg = neg;
        self.log_odds = (w_pos.max(f64::EPSILON) / w_neg.max(f64::EPSILON)).ln();
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> PrepResult<Vec<f64>> {
        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let d_pos: f64 = row.iter().zip(&self.pos).map(|(v, c)| (v - c).powi(2)).sum();
                let d_neg: f64 = row.iter().zip(&self.neg).map(|(v, c)| (v - c).powi(2)).sum();
                let z = self.log_odds + (d_neg - d_pos) / 2.0;
                1.0 / (1.0 + (-z).exp())
            })
            .collect())
    }
}

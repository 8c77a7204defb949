//! Terminal summaries of a prepared experiment and its evaluation

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::{ClassificationMetrics, PreparedExperiment, ThresholdSummary};

/// Print a table indented to line up with the step output
fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

fn print_section_title(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|l| Cell::new(l).add_attribute(Attribute::Bold))
        .collect()
}

/// Partition sizes, churn rates and training-set treatment.
pub fn display_preparation_summary(experiment: &PreparedExperiment) {
    print_section_title("📋", "PREPARATION SUMMARY");

    let sizes = &experiment.split_sizes;
    let total = sizes.train + sizes.validation + sizes.test;
    let share = |n: usize| {
        if total == 0 {
            0.0
        } else {
            n as f64 / total as f64 * 100.0
        }
    };

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["Partition", "Rows", "Share", "Churn rate"]));
    for (name, rows, rate) in [
        ("🏋️  Train", sizes.train, sizes.train_positive_rate),
        ("🔍 Validation", sizes.validation, sizes.validation_positive_rate),
        ("🧪 Test", sizes.test, sizes.test_positive_rate),
    ] {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(rows),
            Cell::new(format!("{:.1}%", share(rows))),
            Cell::new(format!("{:.2}%", rate * 100.0)).fg(Color::Yellow),
        ]);
    }
    print_indented(&table);
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["Setting", "Value"]));
    table.add_row(vec![
        Cell::new("Model family"),
        Cell::new(experiment.family.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("Features"),
        Cell::new(experiment.feature_names.len()).fg(Color::Green),
    ]);
    table.add_row(vec![
        Cell::new("Resampling"),
        Cell::new(experiment.resampling.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("Training rows after resampling"),
        Cell::new(experiment.train.y.len()).fg(if experiment.train.y.len() == sizes.train {
            Color::White
        } else {
            Color::Cyan
        }),
    ]);
    table.add_row(vec![
        Cell::new("Sample weights"),
        Cell::new(experiment.weighting.map_or("none", |w| w.name())),
    ]);
    table.add_row(vec![
        Cell::new("scale_pos_weight"),
        Cell::new(
            experiment
                .scale_pos_weight
                .map_or("n/a".to_string(), |s| format!("{:.4}", s)),
        ),
    ]);
    print_indented(&table);
}

fn metric_cells(m: &ClassificationMetrics) -> Vec<Cell> {
    vec![
        Cell::new(format!("{:.2}", m.threshold)),
        Cell::new(format!("{:.4}", m.accuracy)),
        Cell::new(format!("{:.4}", m.precision)),
        Cell::new(format!("{:.4}", m.recall)),
        Cell::new(format!("{:.4}", m.f1)),
    ]
}

/// Default, best-F1, best-recall and precision-at-recall operating points.
pub fn display_threshold_summary(summary: &ThresholdSummary) {
    print_section_title("🎯", "THRESHOLD SUMMARY");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&[
        "Scenario",
        "Threshold",
        "Accuracy",
        "Precision",
        "Recall",
        "F1",
    ]));

    let recall_label = format!("Recall >= {:.0}%", summary.min_recall * 100.0);
    let rows: [(&str, Option<&ClassificationMetrics>); 4] = [
        ("Default", Some(&summary.default)),
        ("Best F1", Some(&summary.best_f1)),
        ("Best Recall", Some(&summary.best_recall)),
        (recall_label.as_str(), summary.precision_at_recall.as_ref()),
    ];

    for (scenario, metrics) in rows {
        let mut cells = vec![Cell::new(scenario)];
        match metrics {
            Some(m) => cells.extend(metric_cells(m)),
            None => cells.extend((0..5).map(|_| Cell::new("-").fg(Color::DarkGrey))),
        }
        table.add_row(cells);
    }
    print_indented(&table);
    println!(
        "      ROC-AUC: {}",
        style(format!("{:.4}", summary.default.roc_auc)).yellow().bold()
    );
}

/// Every threshold of a sweep, one row each.
pub fn display_threshold_table(results: &[ClassificationMetrics]) {
    print_section_title("📈", "THRESHOLD SWEEP");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["Threshold", "Accuracy", "Precision", "Recall", "F1"]));
    for m in results {
        table.add_row(metric_cells(m));
    }
    print_indented(&table);
}

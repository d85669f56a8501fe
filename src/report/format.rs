//! Formatted terminal output for calibration results, presets and model info.
//!
//! We keep formatting code in one place so:
//! - the pipeline and chart code stay clean and testable
//! - output changes are localized (important for snapshot tests)

use crate::chart::{ChartSeries, Field, SeriesKind, calibration_error};
use crate::domain::{CalibrationOutcome, ChartPoint, ModelInfo, ModelType, ParameterSet};

/// Header block for one calibration outcome.
pub fn format_outcome_summary(outcome: &CalibrationOutcome, series: &ChartSeries) -> String {
    let resp = &outcome.response;
    let mut out = String::new();

    out.push_str(&format!("=== calib - {} ===\n", outcome.model.widget().display_name()));
    out.push_str(&format!(
        "Model: {} ({})\n",
        outcome.model.display_name(),
        outcome.model.as_str()
    ));
    if let Some(computation) = outcome.computation_type() {
        out.push_str(&format!("Computation: {}\n", computation.as_str()));
    }
    if let Some(status) = &resp.status {
        out.push_str(&format!("Status: {status}\n"));
    }
    if let Some(message) = &resp.message {
        out.push_str(&format!("Message: {message}\n"));
    }

    out.push_str(&format!(
        "Response: {} ms | cached={}",
        outcome.response_time_ms,
        resp.cached()
    ));
    if let Some(exec) = resp.execution_time_ms() {
        out.push_str(&format!(" | backend={exec:.1} ms"));
    }
    out.push('\n');

    out.push_str(&format!("Points: n={}", series.points.len()));
    if let (Some(first), Some(last)) = (series.points.first(), series.points.last()) {
        out.push_str(&format!(" | strike=[{:.4}, {:.4}]", first.strike, last.strike));
    }
    out.push('\n');

    if series.kind == SeriesKind::Zabr {
        if let Some(err) = calibration_error(&resp.data) {
            out.push_str(&format!("Calibration error: {err:.6}\n"));
        }
    }

    out
}

/// Table of chart rows, showing only the columns the series kind uses.
///
/// With more than `max_rows` rows, evenly spaced rows are shown (first and
/// last always included).
pub fn format_points_table(series: &ChartSeries, max_rows: usize) -> String {
    let columns: &[(&str, Field)] = match series.kind {
        SeriesKind::Volatility | SeriesKind::Demo => &[
            ("calibrated", Field::CalibratedVol),
            ("mid", Field::Mid),
            ("bid", Field::Bid),
            ("ask", Field::Ask),
        ],
        SeriesKind::Density => &[("density", Field::Density)],
        SeriesKind::Zabr => &[
            ("initial%", Field::InitialVol),
            ("dynamic%", Field::DynamicVol),
            ("difference", Field::Difference),
        ],
    };

    let mut out = String::new();
    let mut header = format!("{:>12}", "strike");
    let mut rule = format!("{:-<12}", "");
    for (name, _) in columns {
        header.push_str(&format!(" {name:>12}"));
        rule.push_str(&format!(" {:-<12}", ""));
    }
    out.push_str(&header);
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');

    for p in sample_rows(&series.points, max_rows) {
        let mut row = format!("{:>12.4}", p.strike);
        for (_, field) in columns {
            row.push_str(&format!(" {:>12}", fmt_opt(field.get(p))));
        }
        out.push_str(row.trim_end());
        out.push('\n');
    }

    out
}

/// Preset values for each model, one block per model.
pub fn format_presets(models: &[(ModelType, ParameterSet)]) -> String {
    let mut out = String::new();
    for (model, params) in models {
        out.push_str(&format!("[{}] {}\n", model.as_str(), model.display_name()));
        for (key, value) in &params.values {
            out.push_str(&format!("  {key:<18} {value}\n"));
        }
        out.push('\n');
    }
    out
}

pub fn format_model_info(info: &ModelInfo) -> String {
    let mut out = String::new();
    out.push_str(&format!("Model: {}\n", info.model_type));
    if !info.description.is_empty() {
        out.push_str(&format!("{}\n", info.description));
    }
    out.push_str("\nDefaults:\n");
    for (key, value) in &info.default_parameters {
        out.push_str(&format!("  {key:<18} {value}\n"));
    }
    if !info.parameter_ranges.is_empty() {
        out.push_str("\nRanges (min, max, step):\n");
        for (key, [min, max, step]) in &info.parameter_ranges {
            out.push_str(&format!("  {key:<18} {min}, {max}, {step}\n"));
        }
    }
    out
}

fn sample_rows(points: &[ChartPoint], max_rows: usize) -> Vec<&ChartPoint> {
    let n = points.len();
    if n <= max_rows || max_rows < 2 {
        return points.iter().take(max_rows).collect();
    }
    (0..max_rows)
        .map(|i| &points[i * (n - 1) / (max_rows - 1)])
        .collect()
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.6}")).unwrap_or_else(|| "-".to_string())
}

//! Derive chart series from a calibration outcome.

use crate::chart::merge::{Field, SeriesSource, merge_by_strike};
use crate::domain::{CalibrationData, CalibrationOutcome, CalibrationResponse, ChartPoint, ComputationType, ModelType};

/// What a series set depicts; drives labels and which lines are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    /// Calibrated vol curve plus optional bid/ask/mid quotes.
    Volatility,
    Density,
    /// ZABR initial vs dynamic vol (percent). The raw difference rides along
    /// in the rows for tables and CSV export but is not drawn.
    Zabr,
    /// Placeholder smile shown before the first result.
    Demo,
}

impl SeriesKind {
    pub fn y_label(self) -> &'static str {
        match self {
            SeriesKind::Volatility | SeriesKind::Demo => "implied vol",
            SeriesKind::Density => "density",
            SeriesKind::Zabr => "vol (%)",
        }
    }
}

/// One drawable line extracted from the chart rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesLine {
    pub field: Field,
    pub label: &'static str,
    /// Quotes are drawn as dots, curves as lines.
    pub dotted: bool,
    pub points: Vec<(f64, f64)>,
}

/// Chart rows for one result, sorted ascending by strike.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub kind: SeriesKind,
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    /// Split the rows into per-field lines, skipping fields with no values.
    ///
    /// `Field::Difference` is never a line: it is unscaled and would flatten
    /// the percent axis.
    pub fn lines(&self) -> Vec<SeriesLine> {
        let specs: &[(Field, &'static str, bool)] = match self.kind {
            SeriesKind::Volatility | SeriesKind::Demo => &[
                (Field::CalibratedVol, "calibrated", false),
                (Field::Mid, "mid", true),
                (Field::Bid, "bid", true),
                (Field::Ask, "ask", true),
            ],
            SeriesKind::Density => &[(Field::Density, "density", false)],
            SeriesKind::Zabr => &[
                (Field::InitialVol, "initial", false),
                (Field::DynamicVol, "dynamic", false),
            ],
        };

        specs
            .iter()
            .filter_map(|&(field, label, dotted)| {
                let points: Vec<(f64, f64)> = self
                    .points
                    .iter()
                    .filter_map(|p| field.get(p).map(|v| (p.strike, v)))
                    .filter(|(_, v)| v.is_finite())
                    .collect();
                (!points.is_empty()).then_some(SeriesLine {
                    field,
                    label,
                    dotted,
                    points,
                })
            })
            .collect()
    }
}

/// Build chart rows for a fresh outcome.
pub fn derive_series(outcome: &CalibrationOutcome) -> ChartSeries {
    match outcome.model {
        ModelType::Zabr(_) => zabr_series(&outcome.response.data),
        ModelType::Asv(requested) => asv_series(&outcome.response, requested),
    }
}

/// ASV-endpoint rows, shaped by the response's resolved computation type.
///
/// `requested` is the type that was sent; it decides the shape when the
/// response names none.
pub fn asv_series(response: &CalibrationResponse, requested: ComputationType) -> ChartSeries {
    let data = &response.data;
    match response.resolve_computation_type(Some(requested)) {
        ComputationType::Density => ChartSeries {
            kind: SeriesKind::Density,
            points: merge_by_strike(&[
                SeriesSource::new(&data.strikes).with(Field::Density, data.density.as_deref()),
            ]),
        },
        _ => {
            let mut sources = vec![SeriesSource::new(&data.strikes).with(Field::CalibratedVol, data.vols.as_deref())];
            if let Some(quote_strikes) = data.calibration_strikes.as_deref() {
                sources.push(
                    SeriesSource::new(quote_strikes)
                        .with(Field::Mid, data.mid_values.as_deref())
                        .with(Field::Bid, data.bid_values.as_deref())
                        .with(Field::Ask, data.ask_values.as_deref()),
                );
            }
            ChartSeries {
                kind: SeriesKind::Volatility,
                points: merge_by_strike(&sources),
            }
        }
    }
}

/// ZABR rows: vols scaled to percent, difference kept raw (table/export only).
pub fn zabr_series(data: &CalibrationData) -> ChartSeries {
    let initial = data.initial_volatility.as_deref().map(to_percent);
    let dynamic = data.dynamic_volatility.as_deref().map(to_percent);
    let points = merge_by_strike(&[SeriesSource::new(&data.strikes)
        .with(Field::InitialVol, initial.as_deref())
        .with(Field::DynamicVol, dynamic.as_deref())
        .with(Field::Difference, data.volatility_difference.as_deref())]);
    ChartSeries {
        kind: SeriesKind::Zabr,
        points,
    }
}

fn to_percent(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| v * 100.0).collect()
}

/// `|mean(volatility_difference)|`, the ZABR widget's headline error metric.
pub fn calibration_error(data: &CalibrationData) -> Option<f64> {
    let diff = data.volatility_difference.as_deref()?;
    if diff.is_empty() {
        return None;
    }
    Some((diff.iter().sum::<f64>() / diff.len() as f64).abs())
}

/// U-shaped placeholder smile: strikes 1800..=2790, `0.4 + 0.6·x²` with `x = (K − 2200)/400`.
pub fn demo_series() -> ChartSeries {
    let points = (0..100)
        .map(|i| {
            let strike = 1800.0 + f64::from(i) * 10.0;
            let x = (strike - 2200.0) / 400.0;
            ChartPoint {
                calibrated_vol: Some(0.4 + 0.6 * x * x),
                ..ChartPoint::at(strike)
            }
        })
        .collect();
    ChartSeries {
        kind: SeriesKind::Demo,
        points,
    }
}

/// Axis bounds over a set of lines.
///
/// Y pads 10% away from zero on each side (`[max(0, 0.9·min), 1.1·max]` for
/// positive data). Empty input yields x `[0, 2]`, y `[0, 1]`.
pub fn axis_bounds<'a, I>(lines: I) -> ([f64; 2], [f64; 2])
where
    I: IntoIterator<Item = &'a [(f64, f64)]>,
{
    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for line in lines {
        for &(x, y) in line {
            if !(x.is_finite() && y.is_finite()) {
                continue;
            }
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
    }

    if !(x_min.is_finite() && y_min.is_finite()) {
        return ([0.0, 2.0], [0.0, 1.0]);
    }

    let y_lo = if y_min >= 0.0 { (y_min * 0.9).max(0.0) } else { y_min * 1.1 };
    let y_hi = if y_max >= 0.0 { y_max * 1.1 } else { y_max * 0.9 };

    (widen([x_min, x_max]), widen([y_lo, y_hi]))
}

/// Give a degenerate range some width so the chart can still be built.
fn widen(range: [f64; 2]) -> [f64; 2] {
    if range[1] > range[0] {
        return range;
    }
    let pad = (range[0].abs() * 0.05).max(0.5);
    [range[0] - pad, range[1] + pad]
}

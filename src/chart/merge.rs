//! Strike-keyed merge of response arrays into chart rows.
//!
//! Within a source, values pair with strikes by index. Across sources, rows
//! are joined on the strike value itself, so market quotes and calibrated
//! curves line up even when the backend returns them on different grids.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::warn;

use crate::domain::ChartPoint;

/// Which `ChartPoint` field a value array fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    CalibratedVol,
    Mid,
    Bid,
    Ask,
    Density,
    InitialVol,
    DynamicVol,
    Difference,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::CalibratedVol,
        Field::Mid,
        Field::Bid,
        Field::Ask,
        Field::Density,
        Field::InitialVol,
        Field::DynamicVol,
        Field::Difference,
    ];

    /// Column name, matching the serialized `ChartPoint` key.
    pub fn key(self) -> &'static str {
        match self {
            Field::CalibratedVol => "calibratedVol",
            Field::Mid => "mid",
            Field::Bid => "bid",
            Field::Ask => "ask",
            Field::Density => "density",
            Field::InitialVol => "initialVol",
            Field::DynamicVol => "dynamicVol",
            Field::Difference => "difference",
        }
    }

    fn apply(self, point: &mut ChartPoint, value: f64) {
        let slot = match self {
            Field::CalibratedVol => &mut point.calibrated_vol,
            Field::Mid => &mut point.mid,
            Field::Bid => &mut point.bid,
            Field::Ask => &mut point.ask,
            Field::Density => &mut point.density,
            Field::InitialVol => &mut point.initial_vol,
            Field::DynamicVol => &mut point.dynamic_vol,
            Field::Difference => &mut point.difference,
        };
        *slot = Some(value);
    }

    /// Read this field from a row.
    pub fn get(self, point: &ChartPoint) -> Option<f64> {
        match self {
            Field::CalibratedVol => point.calibrated_vol,
            Field::Mid => point.mid,
            Field::Bid => point.bid,
            Field::Ask => point.ask,
            Field::Density => point.density,
            Field::InitialVol => point.initial_vol,
            Field::DynamicVol => point.dynamic_vol,
            Field::Difference => point.difference,
        }
    }
}

/// A strike array plus the value arrays that share its indexing.
#[derive(Debug, Clone)]
pub struct SeriesSource<'a> {
    pub strikes: &'a [f64],
    pub fields: Vec<(Field, &'a [f64])>,
}

impl<'a> SeriesSource<'a> {
    pub fn new(strikes: &'a [f64]) -> Self {
        Self {
            strikes,
            fields: Vec::new(),
        }
    }

    /// Attach a value array; `None` (absent in the response) is skipped.
    pub fn with(mut self, field: Field, values: Option<&'a [f64]>) -> Self {
        if let Some(values) = values {
            self.fields.push((field, values));
        }
        self
    }
}

/// Total-ordered strike key for the merge map.
#[derive(Debug, Clone, Copy)]
struct StrikeKey(f64);

impl PartialEq for StrikeKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for StrikeKey {}

impl PartialOrd for StrikeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StrikeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Merge `sources` into rows sorted ascending by strike.
pub fn merge_by_strike(sources: &[SeriesSource<'_>]) -> Vec<ChartPoint> {
    let mut rows: BTreeMap<StrikeKey, ChartPoint> = BTreeMap::new();

    for source in sources {
        for (field, values) in &source.fields {
            if values.len() != source.strikes.len() {
                warn!(
                    ?field,
                    strikes = source.strikes.len(),
                    values = values.len(),
                    "value array length differs from strike array"
                );
            }
        }

        for (idx, &strike) in source.strikes.iter().enumerate() {
            if !strike.is_finite() {
                continue;
            }
            // -0.0 and 0.0 must land on the same row.
            let strike = if strike == 0.0 { 0.0 } else { strike };
            let row = rows
                .entry(StrikeKey(strike))
                .or_insert_with(|| ChartPoint::at(strike));
            for (field, values) in &source.fields {
                if let Some(&value) = values.get(idx) {
                    field.apply(row, value);
                }
            }
        }
    }

    rows.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_length_inputs_keep_every_point_sorted() {
        let strikes = [2100.0, 1900.0, 2000.0];
        let vols = [0.19, 0.21, 0.18];
        let quote_strikes = [2050.0, 1950.0, 2150.0];
        let mids = [0.185, 0.2, 0.195];
        let rows = merge_by_strike(&[
            SeriesSource::new(&strikes).with(Field::CalibratedVol, Some(&vols[..])),
            SeriesSource::new(&quote_strikes).with(Field::Mid, Some(&mids[..])),
        ]);

        assert_eq!(rows.len(), 6);
        assert!(rows.windows(2).all(|w| w[0].strike < w[1].strike));
        assert_eq!(rows[0].strike, 1900.0);
        assert_eq!(rows[0].calibrated_vol, Some(0.21));
        assert_eq!(rows[1].mid, Some(0.2));
        assert_eq!(rows[1].calibrated_vol, None);
    }

    #[test]
    fn shared_strikes_merge_into_one_row() {
        let strikes = [100.0, 110.0];
        let vols = [0.3, 0.25];
        let bids = [0.29, 0.24];
        let asks = [0.31, 0.26];
        let rows = merge_by_strike(&[
            SeriesSource::new(&strikes).with(Field::CalibratedVol, Some(&vols[..])),
            SeriesSource::new(&strikes)
                .with(Field::Bid, Some(&bids[..]))
                .with(Field::Ask, Some(&asks[..]))
                .with(Field::Mid, None),
        ]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].calibrated_vol, Some(0.25));
        assert_eq!(rows[1].bid, Some(0.24));
        assert_eq!(rows[1].ask, Some(0.26));
        assert_eq!(rows[1].mid, None);
    }

    #[test]
    fn short_value_arrays_leave_fields_empty() {
        let strikes = [1.0, 2.0, 3.0];
        let vols = [0.1];
        let rows = merge_by_strike(&[SeriesSource::new(&strikes).with(Field::CalibratedVol, Some(&vols[..]))]);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].calibrated_vol, Some(0.1));
        assert_eq!(rows[2].calibrated_vol, None);
    }

    #[test]
    fn non_finite_strikes_are_skipped() {
        let strikes = [f64::NAN, 1.0, f64::INFINITY];
        let vols = [0.1, 0.2, 0.3];
        let rows = merge_by_strike(&[SeriesSource::new(&strikes).with(Field::CalibratedVol, Some(&vols[..]))]);
        assert_eq!(rows, vec![ChartPoint {
            calibrated_vol: Some(0.2),
            ..ChartPoint::at(1.0)
        }]);
    }
}

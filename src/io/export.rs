//! Export chart rows to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::chart::{ChartSeries, Field};
use crate::error::AppError;

/// Write chart rows to a CSV file. Absent values are empty cells.
pub fn write_points_csv(path: &Path, series: &ChartSeries) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::config(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_points(&mut file, series)
        .map_err(|e| AppError::config(format!("Failed to write export CSV '{}': {e}", path.display())))
}

fn write_points<W: Write>(out: &mut W, series: &ChartSeries) -> std::io::Result<()> {
    let header: Vec<&str> = std::iter::once("strike")
        .chain(Field::ALL.iter().map(|f| f.key()))
        .collect();
    writeln!(out, "{}", header.join(","))?;

    for p in &series.points {
        let mut row = format!("{:.10}", p.strike);
        for field in Field::ALL {
            row.push(',');
            if let Some(v) = field.get(p) {
                row.push_str(&format!("{v:.10}"));
            }
        }
        writeln!(out, "{row}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::SeriesKind;
    use crate::domain::ChartPoint;

    #[test]
    fn csv_has_header_and_blank_cells_for_absent_values() {
        let series = ChartSeries {
            kind: SeriesKind::Volatility,
            points: vec![ChartPoint {
                calibrated_vol: Some(0.18),
                ask: Some(0.2),
                ..ChartPoint::at(2000.0)
            }],
        };
        let mut buf = Vec::new();
        write_points(&mut buf, &series).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("strike,calibratedVol,mid,bid,ask,density,initialVol,dynamicVol,difference")
        );
        assert_eq!(
            lines.next(),
            Some("2000.0000000000,0.1800000000,,,0.2000000000,,,,")
        );
        assert_eq!(lines.next(), None);
    }
}

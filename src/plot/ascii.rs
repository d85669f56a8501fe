//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks after a one-shot calibration
//! - deterministic output (helpful for golden tests)
//!
//! Curves are drawn as connected lines; market quotes overlay them as single
//! letters (`m` mid, `b` bid, `a` ask).

use crate::chart::{ChartSeries, Field, SeriesLine, axis_bounds};

/// Render every line of `series` onto a `width × height` grid.
pub fn render_ascii_plot(series: &ChartSeries, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let lines = series.lines();
    let ([x_min, x_max], [y_min, y_max]) = axis_bounds(lines.iter().map(|l| l.points.as_slice()));

    let mut grid = vec![vec![' '; width]; height];

    // Curves first so quotes can overlay them.
    for line in lines.iter().filter(|l| !l.dotted) {
        draw_curve(&mut grid, &line.points, marker(line.field), (x_min, x_max), (y_min, y_max));
    }
    for line in lines.iter().filter(|l| l.dotted) {
        let ch = marker(line.field);
        for &(x, y) in &line.points {
            let col = map_x(x, x_min, x_max, width);
            let row = map_y(y, y_min, y_max, height);
            grid[row][col] = ch;
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: strike=[{x_min:.3}, {x_max:.3}] | {}=[{y_min:.4}, {y_max:.4}]\n",
        series.kind.y_label()
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    if !lines.is_empty() {
        out.push_str(&legend(&lines));
        out.push('\n');
    }
    out
}

fn legend(lines: &[SeriesLine]) -> String {
    let entries: Vec<String> = lines
        .iter()
        .map(|l| format!("{} {}", marker(l.field), l.label))
        .collect();
    format!("legend: {}", entries.join("  "))
}

fn marker(field: Field) -> char {
    match field {
        Field::CalibratedVol | Field::Density | Field::InitialVol => '-',
        Field::DynamicVol => '=',
        Field::Mid => 'm',
        Field::Bid => 'b',
        Field::Ask => 'a',
        Field::Difference => 'd',
    }
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], ch: char, x_range: (f64, f64), y_range: (f64, f64)) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        let col = map_x(x, x_range.0, x_range.1, width);
        let row = map_y(y, y_range.0, y_range.1, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, ch);
        } else if grid[row][col] == ' ' {
            grid[row][col] = ch;
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish). Never overwrites a non-blank cell.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::SeriesKind;
    use crate::domain::ChartPoint;

    #[test]
    fn plot_golden_snapshot_small() {
        let series = ChartSeries {
            kind: SeriesKind::Volatility,
            points: vec![
                ChartPoint {
                    calibrated_vol: Some(0.2),
                    ..ChartPoint::at(1.0)
                },
                ChartPoint {
                    mid: Some(0.3),
                    ..ChartPoint::at(2.0)
                },
                ChartPoint {
                    calibrated_vol: Some(0.4),
                    ..ChartPoint::at(3.0)
                },
            ],
        };

        let txt = render_ascii_plot(&series, 10, 5);
        let expected = concat!(
            "Plot: strike=[1.000, 3.000] | implied vol=[0.1800, 0.4400]\n",
            "          \n",
            "        --\n",
            "     m--  \n",
            "  ---     \n",
            "--        \n",
            "legend: - calibrated  m mid\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn empty_series_renders_blank_grid() {
        let series = ChartSeries {
            kind: SeriesKind::Density,
            points: Vec::new(),
        };
        let txt = render_ascii_plot(&series, 10, 5);
        assert!(txt.starts_with("Plot: strike=[0.000, 2.000] | density=[0.0000, 1.0000]\n"));
        assert_eq!(txt.lines().count(), 6);
    }
}

use std::path::{Path, PathBuf};

use plotters::prelude::*;
use tracing::info;

use crate::dataset::Dataset;
use crate::error::{AgroError, AgroResult};

use super::{draw_source_note, FIGURE_SIZE, STEEL_BLUE};

const X_COLUMN: &str = "fertilizer_quantity";
const Y_COLUMN: &str = "output_quantity";
const SIZE_COLUMN: &str = "labor_quantity";

/// Bubble chart for one year: fertilizer use against output on log-log
/// axes, with the bubble area following labor.
///
/// Rows missing any of the three quantities (or with non-positive values,
/// which a log axis cannot place) are left out; a year with nothing left to
/// plot is an invalid selection.
pub fn render(cleaned: &Dataset, year: i32, out: &Path) -> AgroResult<PathBuf> {
    let x_col = cleaned.column_index(X_COLUMN)?;
    let y_col = cleaned.column_index(Y_COLUMN)?;
    let size_col = cleaned.column_index(SIZE_COLUMN)?;

    let mut points: Vec<(f64, f64, f64)> = Vec::new();
    for row in cleaned.rows_for_year(year) {
        if let (Some(x), Some(y), Some(s)) =
            (row.values[x_col], row.values[y_col], row.values[size_col])
        {
            if x > 0.0 && y > 0.0 && s >= 0.0 {
                points.push((x, y, s));
            }
        }
    }
    if points.is_empty() {
        return Err(AgroError::InvalidSelection(format!(
            "no observations for {year}; the dataset covers 1961 to 2019"
        )));
    }

    let x_min = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let x_max = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let y_min = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let y_max = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let s_min = points.iter().map(|p| p.2).fold(f64::INFINITY, f64::min);
    let s_max = points.iter().map(|p| p.2).fold(f64::NEG_INFINITY, f64::max);

    let root = BitMapBackend::new(out, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Fertilizer, Output and Labor Quantity in {year}"),
            ("sans-serif", 28),
        )
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(
            (x_min / 2.0..x_max * 2.0).log_scale(),
            (y_min / 2.0..y_max * 2.0).log_scale(),
        )?;
    chart
        .configure_mesh()
        .x_desc("Fertilizer Quantity (in tons)")
        .y_desc("Output Quantity (in 1000$)")
        .draw()?;

    chart.draw_series(points.iter().map(|&(x, y, s)| {
        Circle::new((x, y), bubble_radius(s, s_min, s_max), STEEL_BLUE.mix(0.5).filled())
    }))?;

    draw_source_note(&root)?;
    root.present()?;
    info!(year, bubbles = points.len(), path = %out.display(), "rendered gapminder chart");
    Ok(out.to_path_buf())
}

/// Pixel radius for a bubble; the *area* scales with the value, so the
/// radius follows its square root.
fn bubble_radius(value: f64, min: f64, max: f64) -> i32 {
    const MIN_RADIUS: f64 = 6.0;
    const MAX_RADIUS: f64 = 22.0;
    if max <= min {
        return MIN_RADIUS as i32;
    }
    let t = ((value - min) / (max - min)).sqrt();
    (MIN_RADIUS + (MAX_RADIUS - MIN_RADIUS) * t).round() as i32
}

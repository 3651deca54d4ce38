use std::path::{Path, PathBuf};

use plotters::prelude::*;
use tracing::info;

use crate::dataset::Dataset;
use crate::error::{AgroError, AgroResult};

use super::{draw_source_note, FIGURE_SIZE};

const OUTPUT_COLUMN: &str = "output_quantity";

/// Past a dozen series the legend stops being readable, so it is dropped.
const LEGEND_LIMIT: usize = 12;

/// Line chart comparing total output across countries over time.
///
/// An empty `countries` slice means "all countries", not an empty chart;
/// any named country must exist in the cleaned table.
pub fn render(cleaned: &Dataset, countries: &[String], out: &Path) -> AgroResult<PathBuf> {
    let output = cleaned.column_index(OUTPUT_COLUMN)?;

    let selected: Vec<String> = if countries.is_empty() {
        cleaned.countries()
    } else {
        for name in countries {
            if !cleaned.has_country(name) {
                return Err(AgroError::InvalidSelection(format!(
                    "`{name}` is not a country in the dataset, try another one"
                )));
            }
        }
        countries.to_vec()
    };

    let mut series: Vec<(String, Vec<(i32, f64)>)> = Vec::new();
    for name in &selected {
        let mut points: Vec<(i32, f64)> = cleaned
            .rows_for_country(name)
            .filter_map(|r| r.values[output].map(|v| (r.year, v)))
            .collect();
        points.sort_by_key(|&(year, _)| year);
        if !points.is_empty() {
            series.push((name.clone(), points));
        }
    }
    if series.is_empty() {
        return Err(AgroError::InvalidSelection(
            "no output observations for the selected countries".into(),
        ));
    }

    let x_min = series.iter().flat_map(|(_, p)| p.iter().map(|&(y, _)| y)).min().unwrap_or(0);
    let mut x_max = series.iter().flat_map(|(_, p)| p.iter().map(|&(y, _)| y)).max().unwrap_or(0);
    if x_max == x_min {
        x_max += 1;
    }
    let y_max = series
        .iter()
        .flat_map(|(_, p)| p.iter().map(|&(_, v)| v))
        .fold(0.0_f64, f64::max)
        .max(f64::EPSILON)
        * 1.05;

    let root = BitMapBackend::new(out, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Output Comparison for Selected Countries", ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x_min..x_max, 0.0..y_max)?;
    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc("Output")
        .draw()?;

    for (idx, (name, points)) in series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
            .label(name.clone())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2))
            });
    }

    if series.len() <= LEGEND_LIMIT {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    draw_source_note(&root)?;
    root.present()?;
    info!(countries = series.len(), path = %out.display(), "rendered output comparison");
    Ok(out.to_path_buf())
}

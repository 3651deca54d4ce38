use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::FontTransform;
use tracing::info;

use crate::dataset::Dataset;
use crate::error::{AgroError, AgroResult};
use crate::geo::WorldMap;

use super::{draw_source_note, sequential, LIGHT_GRAY};

const TFP_COLUMN: &str = "tfp";

/// World map shaded by total factor productivity for one year.
///
/// Boundary names were corrected at load time with the same map as the
/// dataset, so the join is a plain name lookup. Countries without an
/// observation for the year stay light gray.
pub fn render(cleaned: &Dataset, world: &WorldMap, year: i32, out: &Path) -> AgroResult<PathBuf> {
    let tfp = cleaned.column_index(TFP_COLUMN)?;
    if world.is_empty() {
        return Err(AgroError::MissingData("no country boundaries loaded".into()));
    }

    let values: BTreeMap<&str, f64> = cleaned
        .rows_for_year(year)
        .filter_map(|r| r.values[tfp].map(|v| (r.country.as_str(), v)))
        .collect();
    if values.is_empty() {
        return Err(AgroError::InvalidSelection(format!(
            "no total factor productivity observations for {year}"
        )));
    }
    let v_min = values.values().fold(f64::INFINITY, |a, &b| a.min(b));
    let v_max = values.values().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let span = (v_max - v_min).max(f64::EPSILON);

    let root = BitMapBackend::new(out, (1400, 760)).into_drawing_area();
    root.fill(&WHITE)?;
    // the strip on the right holds the color bar
    let (map_area, bar_area) = root.split_horizontally(1290);

    let [x_min, x_max] = world.x_bounds();
    let [y_min, y_max] = world.y_bounds();
    let mut chart = ChartBuilder::on(&map_area)
        .caption(format!("Total Factor Productivity in {year}"), ("sans-serif", 28))
        .margin(15)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    let mut matched = 0usize;
    for shape in world.shapes() {
        let fill = match values.get(shape.name.as_str()) {
            Some(&v) => {
                matched += 1;
                sequential((v - v_min) / span)
            }
            None => LIGHT_GRAY,
        };
        for poly in &shape.geometry.0 {
            let ring: Vec<(f64, f64)> = poly.exterior().0.iter().map(|c| (c.x, c.y)).collect();
            chart.draw_series(std::iter::once(Polygon::new(ring.clone(), fill.filled())))?;
            chart.draw_series(std::iter::once(PathElement::new(ring, BLACK.mix(0.25))))?;
        }
    }

    draw_color_bar(&bar_area, v_min, v_max)?;
    draw_source_note(&root)?;
    root.present()?;
    info!(year, matched, shapes = world.shapes().len(), path = %out.display(), "rendered choropleth");
    Ok(out.to_path_buf())
}

/// Vertical gradient legend with the value range and its label.
fn draw_color_bar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    v_min: f64,
    v_max: f64,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let (w, h) = area.dim_in_pixel();
    let top = 90_i32;
    let bottom = h as i32 - 90;
    let left = 16_i32;
    let right = (w as i32 - 64).max(left + 12);

    for py in top..bottom {
        let t = 1.0 - f64::from(py - top) / f64::from((bottom - top).max(1));
        area.draw(&Rectangle::new(
            [(left, py), (right, py + 1)],
            sequential(t).filled(),
        ))?;
    }
    area.draw(&Rectangle::new([(left, top), (right, bottom)], BLACK.mix(0.6)))?;

    let labels = ("sans-serif", 14).into_font();
    area.draw(&Text::new(format!("{v_max:.2}"), (left, top - 20), labels.clone()))?;
    area.draw(&Text::new(format!("{v_min:.2}"), (left, bottom + 8), labels))?;
    area.draw(&Text::new(
        "Total Factor Productivity",
        (right + 34, top),
        ("sans-serif", 16).into_font().transform(FontTransform::Rotate90),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::fonts_available;
    use crate::dataset::Row;
    use crate::geo::WorldMap;
    use crate::normalize::NormalizeConfig;
    use tempfile::tempdir;

    const FIXTURE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"ADMIN": "Germany"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[6.0, 47.0], [15.0, 47.0], [15.0, 55.0], [6.0, 55.0], [6.0, 47.0]]]
                }
            },
            {
                "type": "Feature",
                "properties": {"ADMIN": "France"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-5.0, 42.0], [8.0, 42.0], [8.0, 51.0], [-5.0, 51.0], [-5.0, 42.0]]]
                }
            }
        ]
    }"#;

    fn world() -> WorldMap {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("countries.geojson");
        std::fs::write(&path, FIXTURE).unwrap();
        WorldMap::from_geojson_file(&path, &NormalizeConfig::default()).unwrap()
    }

    fn sample() -> Dataset {
        Dataset::new(
            vec!["tfp".into()],
            vec![
                Row { country: "Germany".into(), year: 2000, values: vec![Some(101.0)] },
                Row { country: "France".into(), year: 2000, values: vec![Some(87.0)] },
            ],
        )
    }

    #[test]
    fn a_year_without_observations_is_rejected() {
        let tmp = tempdir().unwrap();
        let out = tmp.path().join("map.png");

        let err = render(&sample(), &world(), 1066, &out).unwrap_err();
        assert!(matches!(err, AgroError::InvalidSelection(_)));
        assert!(!out.exists());
    }

    #[test]
    fn renders_matched_and_unmatched_countries() {
        if !fonts_available() {
            return;
        }
        let tmp = tempdir().unwrap();
        let data = Dataset::new(
            vec!["tfp".into()],
            // France has no value for the year and falls back to gray
            vec![Row { country: "Germany".into(), year: 2000, values: vec![Some(101.0)] }],
        );

        let path = render(&data, &world(), 2000, &tmp.path().join("map.png")).unwrap();
        assert!(std::fs::metadata(path).unwrap().len() > 0);
    }
}

use std::path::{Path, PathBuf};

use plotters::prelude::*;
use tracing::info;

use crate::dataset::Dataset;
use crate::error::{AgroError, AgroResult};

use super::{draw_source_note, FIGURE_SIZE, STEEL_BLUE};

const CROP_COLUMN: &str = "crop_output_quantity";
const ANIMAL_COLUMN: &str = "animal_output_quantity";
const FISH_COLUMN: &str = "fish_output_quantity";
const TOTAL_COLUMN: &str = "output_quantity";

/// Stacked area chart of crop, animal and fish output over time.
///
/// A `country` of `None` (or the literal `"World"`) plots the per-year
/// totals of the whole cleaned table; any other name must exist in it. With
/// `normalize` each component is drawn as a share of that year's total
/// output instead of an absolute quantity.
pub fn render(
    cleaned: &Dataset,
    country: Option<&str>,
    normalize: bool,
    out: &Path,
) -> AgroResult<PathBuf> {
    let crop = cleaned.column_index(CROP_COLUMN)?;
    let animal = cleaned.column_index(ANIMAL_COLUMN)?;
    let fish = cleaned.column_index(FISH_COLUMN)?;
    let total = cleaned.column_index(TOTAL_COLUMN)?;

    let subject = match country {
        None | Some("World") => "World".to_string(),
        Some(name) => {
            if !cleaned.has_country(name) {
                return Err(AgroError::InvalidSelection(format!(
                    "`{name}` is not a country in the dataset, try another one"
                )));
            }
            name.to_string()
        }
    };

    let per_year: Vec<(i32, Vec<Option<f64>>)> = if subject == "World" {
        cleaned.yearly_totals()
    } else {
        let mut rows: Vec<(i32, Vec<Option<f64>>)> = cleaned
            .rows_for_country(&subject)
            .map(|r| (r.year, r.values.clone()))
            .collect();
        rows.sort_by_key(|(year, _)| *year);
        rows
    };

    // (year, crop, animal, fish); missing components count as zero, years
    // without a usable total are skipped in share mode
    let mut series: Vec<(i32, f64, f64, f64)> = Vec::new();
    for (year, values) in per_year {
        let mut c = values[crop].unwrap_or(0.0);
        let mut a = values[animal].unwrap_or(0.0);
        let mut f = values[fish].unwrap_or(0.0);
        if normalize {
            match values[total] {
                Some(t) if t > 0.0 => {
                    c /= t;
                    a /= t;
                    f /= t;
                }
                _ => continue,
            }
        }
        series.push((year, c, a, f));
    }
    if series.is_empty() {
        return Err(AgroError::InvalidSelection(format!(
            "no output observations for `{subject}`"
        )));
    }

    let x_min = series[0].0;
    let mut x_max = series[series.len() - 1].0;
    if x_max == x_min {
        x_max += 1;
    }
    let y_max = series
        .iter()
        .map(|(_, c, a, f)| c + a + f)
        .fold(0.0_f64, f64::max)
        .max(f64::EPSILON)
        * 1.05;

    let root = BitMapBackend::new(out, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{subject}'s Output by Type of Crop, Animal, and Fish"),
            ("sans-serif", 28),
        )
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x_min..x_max, 0.0..y_max)?;
    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc("Quantity")
        .draw()?;

    // cumulative bands, tallest first so the lower bands paint over it
    let stack_fish: Vec<(i32, f64)> = series.iter().map(|&(y, c, a, f)| (y, c + a + f)).collect();
    let stack_animal: Vec<(i32, f64)> = series.iter().map(|&(y, c, a, _)| (y, c + a)).collect();
    let stack_crop: Vec<(i32, f64)> = series.iter().map(|&(y, c, _, _)| (y, c)).collect();

    chart
        .draw_series(AreaSeries::new(stack_fish, 0.0, GREEN.mix(0.9)))?
        .label("Output Fish")
        .legend(|(x, y)| Rectangle::new([(x, y - 4), (x + 12, y + 4)], GREEN.filled()));
    chart
        .draw_series(AreaSeries::new(stack_animal, 0.0, STEEL_BLUE.mix(0.9)))?
        .label("Output Animal")
        .legend(|(x, y)| Rectangle::new([(x, y - 4), (x + 12, y + 4)], STEEL_BLUE.filled()));
    chart
        .draw_series(AreaSeries::new(stack_crop, 0.0, RED.mix(0.9)))?
        .label("Output Crop")
        .legend(|(x, y)| Rectangle::new([(x, y - 4), (x + 12, y + 4)], RED.filled()));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    draw_source_note(&root)?;
    root.present()?;
    info!(subject = %subject, normalize, path = %out.display(), "rendered area chart");
    Ok(out.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::fonts_available;
    use crate::dataset::Row;
    use tempfile::tempdir;

    fn output_columns() -> Vec<String> {
        vec![
            "crop_output_quantity".into(),
            "animal_output_quantity".into(),
            "fish_output_quantity".into(),
            "output_quantity".into(),
        ]
    }

    fn sample() -> Dataset {
        let mut rows = Vec::new();
        for year in 2000..2005 {
            let base = f64::from(year - 2000) + 1.0;
            rows.push(Row {
                country: "Germany".into(),
                year,
                values: vec![Some(base), Some(base * 2.0), Some(base / 2.0), Some(base * 3.5)],
            });
            rows.push(Row {
                country: "France".into(),
                year,
                values: vec![Some(base), Some(base), Some(base), Some(base * 3.0)],
            });
        }
        Dataset::new(output_columns(), rows)
    }

    #[test]
    fn unknown_country_is_rejected_before_rendering() {
        let tmp = tempdir().unwrap();
        let out = tmp.path().join("area.png");

        let err = render(&sample(), Some("Atlantis"), false, &out).unwrap_err();
        assert!(matches!(err, AgroError::InvalidSelection(_)));
        assert!(!out.exists());
    }

    #[test]
    fn dataset_without_output_columns_is_rejected() {
        let data = Dataset::new(vec!["tfp".into()], Vec::new());
        let tmp = tempdir().unwrap();

        let err = render(&data, None, false, &tmp.path().join("area.png")).unwrap_err();
        assert!(matches!(err, AgroError::InvalidSelection(_)));
    }

    #[test]
    fn renders_a_country_and_the_world() {
        if !fonts_available() {
            return;
        }
        let tmp = tempdir().unwrap();
        let data = sample();

        let country = render(&data, Some("Germany"), false, &tmp.path().join("c.png")).unwrap();
        let world = render(&data, None, true, &tmp.path().join("w.png")).unwrap();

        assert!(std::fs::metadata(country).unwrap().len() > 0);
        assert!(std::fs::metadata(world).unwrap().len() > 0);
    }
}

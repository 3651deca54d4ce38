use std::path::{Path, PathBuf};

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::info;

use crate::dataset::{Dataset, QUANTITY_SUFFIX};
use crate::error::{AgroError, AgroResult};
use crate::stats::correlation_matrix;

use super::{diverging, draw_source_note, LIGHT_GRAY};

/// Correlation heatmap of the quantity columns.
///
/// The value range is fixed to [-1, 1]; the upper triangle and the diagonal
/// are masked, cells are annotated with their coefficient. Pairs without
/// enough overlapping observations stay gray and unannotated.
pub fn render(cleaned: &Dataset, out: &Path) -> AgroResult<PathBuf> {
    let columns = cleaned.quantity_columns();
    if columns.len() < 2 {
        return Err(AgroError::InvalidSelection(
            "the dataset has no quantity columns to correlate".into(),
        ));
    }
    // tick labels drop the shared suffix to stay readable
    let names: Vec<String> = columns
        .iter()
        .map(|&i| cleaned.columns()[i].trim_end_matches(QUANTITY_SUFFIX).to_string())
        .collect();
    let matrix = correlation_matrix(cleaned, &columns);
    let n = columns.len();

    let root = BitMapBackend::new(out, (940, 840)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Correlation Heatmap", ("sans-serif", 28))
        .margin(25)
        .x_label_area_size(110)
        .y_label_area_size(110)
        .build_cartesian_2d(0.0..n as f64, 0.0..n as f64)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n)
        .y_labels(n)
        .x_label_formatter(&|v| names.get(v.round() as usize).cloned().unwrap_or_default())
        .y_label_formatter(&|v| names.get(v.round() as usize).cloned().unwrap_or_default())
        .label_style(("sans-serif", 13))
        .draw()?;

    for (i, row) in matrix.iter().enumerate() {
        // strictly lower triangle, like the masked seaborn rendering
        for (j, &v) in row.iter().enumerate().take(i) {
            let (x, y) = (j as f64, i as f64);
            let fill = if v.is_nan() { LIGHT_GRAY } else { diverging(v) };
            chart.draw_series(std::iter::once(Rectangle::new(
                [(x, y), (x + 1.0, y + 1.0)],
                fill.filled(),
            )))?;
            chart.draw_series(std::iter::once(Rectangle::new(
                [(x, y), (x + 1.0, y + 1.0)],
                WHITE.stroke_width(1),
            )))?;
            if !v.is_nan() {
                let ink = if v.abs() > 0.6 { WHITE } else { BLACK };
                let style = ("sans-serif", 13)
                    .into_font()
                    .color(&ink)
                    .pos(Pos::new(HPos::Center, VPos::Center));
                chart.draw_series(std::iter::once(Text::new(
                    format!("{v:.2}"),
                    (x + 0.5, y + 0.5),
                    style,
                )))?;
            }
        }
    }

    draw_source_note(&root)?;
    root.present()?;
    info!(columns = n, path = %out.display(), "rendered correlation heatmap");
    Ok(out.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::fonts_available;
    use crate::dataset::Row;
    use tempfile::tempdir;

    #[test]
    fn a_single_quantity_column_is_not_enough() {
        let data = Dataset::new(vec!["tfp".into(), "output_quantity".into()], Vec::new());
        let tmp = tempdir().unwrap();

        let err = render(&data, &tmp.path().join("heat.png")).unwrap_err();
        assert!(matches!(err, AgroError::InvalidSelection(_)));
    }

    #[test]
    fn renders_the_quantity_correlations() {
        if !fonts_available() {
            return;
        }
        let mut rows = Vec::new();
        for year in 2000..2010 {
            let v = f64::from(year - 2000);
            rows.push(Row {
                country: "Germany".into(),
                year,
                values: vec![Some(v), Some(v * 2.0), Some(10.0 - v)],
            });
        }
        let data = Dataset::new(
            vec!["output_quantity".into(), "labor_quantity".into(), "fertilizer_quantity".into()],
            rows,
        );

        let tmp = tempdir().unwrap();
        let path = render(&data, &tmp.path().join("heat.png")).unwrap();
        assert!(std::fs::metadata(path).unwrap().len() > 0);
    }
}

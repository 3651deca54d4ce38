//! Pearson correlation over table columns.

use crate::dataset::Dataset;

/// Sample Pearson correlation coefficient of the paired values.
///
/// `None` when fewer than two pairs are given or either side has zero
/// variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs[..n].iter().zip(&ys[..n]) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x * var_y).sqrt())
}

/// Pairwise Pearson correlations between the selected columns, computed over
/// the rows where both cells are present. Undefined entries are `NAN`.
pub fn correlation_matrix(data: &Dataset, columns: &[usize]) -> Vec<Vec<f64>> {
    let n = columns.len();
    let mut matrix = vec![vec![f64::NAN; n]; n];

    for (i, &ci) in columns.iter().enumerate() {
        for (j, &cj) in columns.iter().enumerate().take(i + 1) {
            let mut xs = Vec::new();
            let mut ys = Vec::new();
            for row in data.rows() {
                if let (Some(x), Some(y)) = (row.values[ci], row.values[cj]) {
                    xs.push(x);
                    ys.push(y);
                }
            }
            let r = pearson(&xs, &ys).unwrap_or(f64::NAN);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Row;

    #[test]
    fn perfectly_linear_series_correlate_to_one() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let up = [2.0, 4.0, 6.0, 8.0];
        let down = [8.0, 6.0, 4.0, 2.0];

        assert!((pearson(&xs, &up).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&xs, &down).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_series_have_no_correlation() {
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
        assert_eq!(pearson(&[1.0], &[1.0]), None);
    }

    #[test]
    fn matrix_skips_rows_with_missing_cells() {
        let data = Dataset::new(
            vec!["a_quantity".into(), "b_quantity".into()],
            vec![
                Row { country: "X".into(), year: 2000, values: vec![Some(1.0), Some(2.0)] },
                Row { country: "X".into(), year: 2001, values: vec![Some(2.0), Some(4.0)] },
                Row { country: "X".into(), year: 2002, values: vec![Some(3.0), None] },
                Row { country: "X".into(), year: 2003, values: vec![Some(4.0), Some(8.0)] },
            ],
        );

        let matrix = correlation_matrix(&data, &[0, 1]);
        assert_eq!(matrix.len(), 2);
        assert!((matrix[0][1] - 1.0).abs() < 1e-12);
        assert_eq!(matrix[0][1], matrix[1][0]);
        assert!((matrix[0][0] - 1.0).abs() < 1e-12);
    }
}

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use csv::ReaderBuilder;
use tracing::{info, warn};

use crate::error::{AgroError, AgroResult};

/// Header of the column naming the reporting entity (a country, or a
/// regional/income rollup before cleaning).
pub const ENTITY_COLUMN: &str = "Entity";
/// Header of the observation-year column.
pub const YEAR_COLUMN: &str = "Year";
/// Suffix shared by the measured-quantity columns.
pub const QUANTITY_SUFFIX: &str = "_quantity";

/// One observation: an entity name, a year and the measured values, one
/// cell per value column of the owning [`Dataset`].
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub country: String,
    pub year: i32,
    pub values: Vec<Option<f64>>,
}

/// An in-memory table: value-column names plus observation rows.
///
/// `columns` holds every header except `Entity` and `Year`; each row carries
/// one cell per entry of `columns`, in the same order. Cells the source
/// leaves empty, or that fail to parse as numbers, are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        debug_assert!(rows.iter().all(|r| r.values.len() == columns.len()));
        Self { columns, rows }
    }

    /// Load a comma-separated source file.
    ///
    /// `Entity` and `Year` are required headers; every other header becomes
    /// a value column. Rows without a parseable year are skipped with a
    /// warning rather than failing the whole load.
    pub fn from_csv(path: impl AsRef<Path>) -> AgroResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| AgroError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(BufReader::new(file));

        let headers = rdr.headers()?.clone();
        let entity_idx = headers
            .iter()
            .position(|h| h == ENTITY_COLUMN)
            .ok_or_else(|| {
                AgroError::Malformed(format!("`{}` has no `{ENTITY_COLUMN}` column", path.display()))
            })?;
        let year_idx = headers.iter().position(|h| h == YEAR_COLUMN).ok_or_else(|| {
            AgroError::Malformed(format!("`{}` has no `{YEAR_COLUMN}` column", path.display()))
        })?;

        let value_cols: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != entity_idx && *i != year_idx)
            .map(|(i, h)| (i, h.to_string()))
            .collect();

        let mut rows = Vec::new();
        let mut skipped = 0usize;
        for record in rdr.records() {
            let record = record?;
            let year = match record.get(year_idx).and_then(|y| y.trim().parse::<i32>().ok()) {
                Some(y) => y,
                None => {
                    skipped += 1;
                    continue;
                }
            };
            let country = record.get(entity_idx).unwrap_or("").trim().to_string();
            let values = value_cols
                .iter()
                .map(|(i, _)| record.get(*i).and_then(|v| v.trim().parse::<f64>().ok()))
                .collect();
            rows.push(Row { country, year, values });
        }
        if skipped > 0 {
            warn!(skipped, path = %path.display(), "dropped rows without a parseable year");
        }
        info!(rows = rows.len(), columns = value_cols.len(), path = %path.display(), "loaded dataset");

        Ok(Self {
            columns: value_cols.into_iter().map(|(_, h)| h).collect(),
            rows,
        })
    }

    /// Write the table as a comma-separated file in the same
    /// `Entity`/`Year` layout the loader expects. Missing cells become
    /// empty fields.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> AgroResult<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| AgroError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut wtr = csv::Writer::from_writer(BufWriter::new(file));

        let mut header = vec![ENTITY_COLUMN.to_string(), YEAR_COLUMN.to_string()];
        header.extend(self.columns.iter().cloned());
        wtr.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.country.clone(), row.year.to_string()];
            record.extend(row.values.iter().map(|v| match v {
                Some(v) => v.to_string(),
                None => String::new(),
            }));
            wtr.write_record(&record)?;
        }
        wtr.flush().map_err(|e| AgroError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a value column, or `InvalidSelection` if the table has no
    /// such column.
    pub fn column_index(&self, name: &str) -> AgroResult<usize> {
        self.columns.iter().position(|c| c == name).ok_or_else(|| {
            AgroError::InvalidSelection(format!("`{name}` is not a column of the dataset"))
        })
    }

    /// Indices of the measured-quantity columns (header ends in
    /// `_quantity`), in table order.
    pub fn quantity_columns(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, name)| name.ends_with(QUANTITY_SUFFIX))
            .map(|(i, _)| i)
            .collect()
    }

    /// Sorted, deduplicated entity names.
    pub fn countries(&self) -> Vec<String> {
        let unique: BTreeSet<&str> = self.rows.iter().map(|r| r.country.as_str()).collect();
        unique.into_iter().map(str::to_string).collect()
    }

    pub fn has_country(&self, name: &str) -> bool {
        self.rows.iter().any(|r| r.country == name)
    }

    pub fn has_year(&self, year: i32) -> bool {
        self.rows.iter().any(|r| r.year == year)
    }

    pub fn rows_for_country<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Row> {
        self.rows.iter().filter(move |r| r.country == name)
    }

    pub fn rows_for_year(&self, year: i32) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(move |r| r.year == year)
    }

    /// Per-year sums of every value column across all rows, in year order.
    /// A year whose cells are all missing for a column stays `None` there.
    pub fn yearly_totals(&self) -> Vec<(i32, Vec<Option<f64>>)> {
        let mut totals: BTreeMap<i32, Vec<Option<f64>>> = BTreeMap::new();
        for row in &self.rows {
            let acc = totals
                .entry(row.year)
                .or_insert_with(|| vec![None; self.columns.len()]);
            for (slot, value) in acc.iter_mut().zip(&row.values) {
                if let Some(v) = value {
                    *slot = Some(slot.unwrap_or(0.0) + v);
                }
            }
        }
        totals.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_csv(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("download.csv");
        fs::write(&path, contents).unwrap();
        (tmp, path)
    }

    #[test]
    fn loads_entity_year_and_value_columns() {
        let (_tmp, path) = write_csv(
            "Entity,Year,tfp,output_quantity\n\
             Germany,2000,1.5,10\n\
             Germany,2001,,11.5\n",
        );
        let data = Dataset::from_csv(&path).unwrap();

        assert_eq!(data.columns(), &["tfp".to_string(), "output_quantity".to_string()]);
        assert_eq!(data.len(), 2);
        assert_eq!(data.rows()[0].country, "Germany");
        assert_eq!(data.rows()[0].year, 2000);
        assert_eq!(data.rows()[0].values, vec![Some(1.5), Some(10.0)]);
        // empty cell stays missing
        assert_eq!(data.rows()[1].values, vec![None, Some(11.5)]);
    }

    #[test]
    fn skips_rows_without_a_year() {
        let (_tmp, path) = write_csv(
            "Entity,Year,output_quantity\n\
             Germany,2000,10\n\
             Germany,not-a-year,11\n",
        );
        let data = Dataset::from_csv(&path).unwrap();
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn missing_entity_column_is_malformed() {
        let (_tmp, path) = write_csv("Country,Year,tfp\nGermany,2000,1.5\n");
        let err = Dataset::from_csv(&path).unwrap_err();
        assert!(matches!(err, AgroError::Malformed(_)));
    }

    #[test]
    fn quantity_columns_follow_the_suffix() {
        let data = Dataset::new(
            vec!["tfp".into(), "output_quantity".into(), "labor_quantity".into()],
            Vec::new(),
        );
        assert_eq!(data.quantity_columns(), vec![1, 2]);
    }

    #[test]
    fn unknown_column_is_an_invalid_selection() {
        let data = Dataset::new(vec!["tfp".into()], Vec::new());
        let err = data.column_index("outputs").unwrap_err();
        assert!(matches!(err, AgroError::InvalidSelection(_)));
    }

    #[test]
    fn writes_the_same_layout_it_reads() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("cleaned.csv");
        let data = Dataset::new(
            vec!["tfp".into(), "output_quantity".into()],
            vec![
                Row { country: "Germany".into(), year: 2000, values: vec![Some(1.5), None] },
                Row { country: "France".into(), year: 2001, values: vec![None, Some(4.0)] },
            ],
        );

        data.write_csv(&path).unwrap();
        assert_eq!(Dataset::from_csv(&path).unwrap(), data);
    }

    #[test]
    fn yearly_totals_sum_per_year() {
        let data = Dataset::new(
            vec!["output_quantity".into()],
            vec![
                Row { country: "A".into(), year: 2000, values: vec![Some(1.0)] },
                Row { country: "B".into(), year: 2000, values: vec![Some(2.0)] },
                Row { country: "A".into(), year: 2001, values: vec![None] },
            ],
        );
        assert_eq!(
            data.yearly_totals(),
            vec![(2000, vec![Some(3.0)]), (2001, vec![None])]
        );
    }
}

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::debug;

use crate::dataset::{Dataset, Row};
use crate::error::{AgroError, AgroResult};

/// Alternate spelling → canonical spelling. The boundaries file and the
/// dataset disagree on a handful of names; both sides are passed through the
/// same corrections so they join cleanly.
static DEFAULT_CORRECTIONS: Lazy<BTreeMap<String, String>> = Lazy::new(|| {
    [
        ("United States of America", "United States"),
        ("Dem. Rep. Congo", "Democratic Republic of Congo"),
        ("Dominican Rep.", "Dominican Republic"),
        ("Timor-Leste", "Timor"),
        ("Eq. Guinea", "Equatorial Guinea"),
        ("eSwatini", "Eswatini"),
        ("Solomon Is.", "Solomon Islands"),
        ("N. Cyprus", "Cyprus"),
        ("Somaliland", "Somalia"),
        ("Bosnia and Herz.", "Bosnia and Herzegovina"),
        ("S. Sudan", "South Sudan"),
    ]
    .into_iter()
    .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
    .collect()
});

/// Entity names that denote multi-country rollups (continents, regions,
/// income groups, "World"), not countries.
static DEFAULT_EXCLUSIONS: Lazy<BTreeSet<String>> = Lazy::new(|| {
    [
        "Asia",
        "Caribbean",
        "Central Africa",
        "Central America",
        "Central Asia",
        "Central Europe",
        "Developed Asia",
        "Developed countries",
        "East Africa",
        "Eastern Europe",
        "Former Soviet Union",
        "High income",
        "Horn of Africa",
        "Latin America and the Caribbean",
        "Least developed countries",
        "Low income",
        "Lower-middle income",
        "Micronesia",
        "North Africa",
        "North America",
        "Northeast Asia",
        "Northern Europe",
        "Oceania",
        "Pacific",
        "Polynesia",
        "Sahel",
        "South Asia",
        "Southeast Asia",
        "Southern Africa",
        "Southern Europe",
        "Sub-Saharan Africa",
        "Upper-middle income",
        "West Africa",
        "West Asia",
        "Western Europe",
        "World",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
});

/// Name cleaning configuration: spelling corrections plus the rollup names
/// to drop. Injectable so the cleaning step can be exercised against
/// synthetic maps; `Default` supplies the production values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NormalizeConfig {
    /// Raw spelling → canonical spelling.
    #[serde(default)]
    pub corrections: BTreeMap<String, String>,
    /// Canonical names excluded as non-country aggregates.
    #[serde(default)]
    pub excluded: BTreeSet<String>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            corrections: DEFAULT_CORRECTIONS.clone(),
            excluded: DEFAULT_EXCLUSIONS.clone(),
        }
    }
}

impl NormalizeConfig {
    /// Read a configuration from a JSON file with `corrections` and
    /// `excluded` keys.
    pub fn from_json_file(path: impl AsRef<Path>) -> AgroResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| AgroError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Canonical spelling for `name`. Unknown names pass through unchanged;
    /// that is a deliberate permissive policy, not a failure.
    pub fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        self.corrections.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.contains(name)
    }
}

/// Clean a raw table: rewrite country names to their canonical spelling,
/// drop rows naming excluded rollups, then merge rows sharing a (canonical
/// name, year) key by summing each value column.
///
/// Purely functional: the input table is untouched and a new table is
/// returned. An empty input yields an empty output. The result holds at
/// most one row per (name, year); a cell is the `None`-aware sum of the
/// contributing cells, staying `None` only when every contribution was
/// missing.
pub fn normalize_and_aggregate(data: &Dataset, config: &NormalizeConfig) -> Dataset {
    let width = data.columns().len();
    let mut groups: BTreeMap<(String, i32), Vec<Option<f64>>> = BTreeMap::new();
    let mut corrected = 0usize;
    let mut dropped = 0usize;

    for row in data.rows() {
        let name = config.canonical(&row.country);
        if name != row.country {
            corrected += 1;
        }
        if config.is_excluded(name) {
            dropped += 1;
            continue;
        }
        let acc = groups
            .entry((name.to_string(), row.year))
            .or_insert_with(|| vec![None; width]);
        for (slot, value) in acc.iter_mut().zip(&row.values) {
            if let Some(v) = value {
                *slot = Some(slot.unwrap_or(0.0) + v);
            }
        }
    }
    debug!(
        input = data.len(),
        output = groups.len(),
        corrected,
        dropped,
        "cleaned table"
    );

    let rows = groups
        .into_iter()
        .map(|((country, year), values)| Row { country, year, values })
        .collect();
    Dataset::new(data.columns().to_vec(), rows)
}

//! Thin orchestration over fetch, cleaning and the chart renderers.

use std::fs;
use std::path::PathBuf;

use reqwest::blocking::Client;
use tracing::info;

use crate::chart;
use crate::dataset::Dataset;
use crate::error::{AgroError, AgroResult};
use crate::fetch::{self, BOUNDARIES_URL, PRODUCTIVITY_URL};
use crate::geo::WorldMap;
use crate::normalize::{normalize_and_aggregate, NormalizeConfig};

/// One analysis session: downloads and caches the source files, keeps the
/// raw and cleaned tables in memory and writes figures into the chart
/// directory.
///
/// Every figure and listing reads the cleaned table, so regional and
/// income-group rollups never leak into per-country output.
pub struct Analysis {
    data_dir: PathBuf,
    chart_dir: PathBuf,
    config: NormalizeConfig,
    client: Client,
    raw: Option<Dataset>,
    cleaned: Option<Dataset>,
    world: Option<WorldMap>,
}

impl Analysis {
    /// A session with the production cleaning configuration.
    pub fn new(data_dir: impl Into<PathBuf>, chart_dir: impl Into<PathBuf>) -> Self {
        Self::with_config(data_dir, chart_dir, NormalizeConfig::default())
    }

    pub fn with_config(
        data_dir: impl Into<PathBuf>,
        chart_dir: impl Into<PathBuf>,
        config: NormalizeConfig,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            chart_dir: chart_dir.into(),
            config,
            client: Client::new(),
            raw: None,
            cleaned: None,
            world: None,
        }
    }

    /// Fetch-and-cache both source files, then load and clean the dataset.
    /// Running it again reuses the cached files instead of re-downloading.
    #[tracing::instrument(level = "info", skip(self))]
    pub fn download_data(&mut self) -> AgroResult<()> {
        let csv_path = fetch::ensure_local(
            &self.client,
            PRODUCTIVITY_URL,
            self.data_dir.join("productivity.csv"),
        )?;
        let geo_path = fetch::ensure_local(
            &self.client,
            BOUNDARIES_URL,
            self.data_dir.join("countries.geojson"),
        )?;

        let raw = Dataset::from_csv(csv_path)?;
        self.world = Some(WorldMap::from_geojson_file(geo_path, &self.config)?);
        self.set_dataset(raw);
        Ok(())
    }

    /// Use an already-loaded table instead of downloading one. The cleaned
    /// table is derived immediately; map figures stay unavailable until
    /// boundaries are loaded via [`Analysis::download_data`].
    pub fn set_dataset(&mut self, raw: Dataset) {
        let cleaned = normalize_and_aggregate(&raw, &self.config);
        info!(raw = raw.len(), cleaned = cleaned.len(), "dataset ready");
        self.cleaned = Some(cleaned);
        self.raw = Some(raw);
    }

    pub fn config(&self) -> &NormalizeConfig {
        &self.config
    }

    pub fn raw(&self) -> AgroResult<&Dataset> {
        self.raw.as_ref().ok_or_else(|| {
            AgroError::MissingData("no dataset loaded; call download_data first".into())
        })
    }

    pub fn cleaned(&self) -> AgroResult<&Dataset> {
        self.cleaned.as_ref().ok_or_else(|| {
            AgroError::MissingData("no dataset loaded; call download_data first".into())
        })
    }

    fn world(&self) -> AgroResult<&WorldMap> {
        self.world.as_ref().ok_or_else(|| {
            AgroError::MissingData("no boundaries loaded; call download_data first".into())
        })
    }

    /// Sorted canonical country names of the cleaned table.
    pub fn list_countries(&self) -> AgroResult<Vec<String>> {
        Ok(self.cleaned()?.countries())
    }

    /// Correlation heatmap of the quantity columns.
    pub fn correlate_quantity(&self) -> AgroResult<PathBuf> {
        self.ensure_chart_dir()?;
        chart::heatmap::render(self.cleaned()?, &self.chart_dir.join("correlation_heatmap.png"))
    }

    /// Stacked area chart of output by type for one country, or the whole
    /// world when `country` is `None`.
    pub fn area_graph(&self, country: Option<&str>, normalize: bool) -> AgroResult<PathBuf> {
        self.ensure_chart_dir()?;
        let file = format!("area_{}.png", slug(country.unwrap_or("World")));
        chart::area::render(self.cleaned()?, country, normalize, &self.chart_dir.join(file))
    }

    /// Output comparison lines; an empty selection compares every country.
    pub fn compare_output(&self, countries: &[String]) -> AgroResult<PathBuf> {
        self.ensure_chart_dir()?;
        chart::compare::render(
            self.cleaned()?,
            countries,
            &self.chart_dir.join("output_comparison.png"),
        )
    }

    /// Fertilizer/output/labor bubble chart for one year.
    pub fn gapminder(&self, year: i32) -> AgroResult<PathBuf> {
        self.ensure_chart_dir()?;
        chart::gapminder::render(
            self.cleaned()?,
            year,
            &self.chart_dir.join(format!("gapminder_{year}.png")),
        )
    }

    /// World choropleth of total factor productivity for one year.
    pub fn choropleth(&self, year: i32) -> AgroResult<PathBuf> {
        self.ensure_chart_dir()?;
        chart::choropleth::render(
            self.cleaned()?,
            self.world()?,
            year,
            &self.chart_dir.join(format!("tfp_{year}.png")),
        )
    }

    fn ensure_chart_dir(&self) -> AgroResult<()> {
        fs::create_dir_all(&self.chart_dir).map_err(|e| AgroError::Io {
            path: self.chart_dir.clone(),
            source: e,
        })
    }
}

fn slug(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

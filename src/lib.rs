//! Educational analysis of the "Agricultural total factor productivity
//! (USDA)" dataset published by Our World in Data.
//!
//! The crate downloads and caches the source files, loads them into a small
//! in-memory table, cleans the country names (canonical spellings, regional
//! rollups dropped, per-country/year aggregation) and renders a handful of
//! figures: a stacked area chart of output by type, a multi-country output
//! comparison, a correlation heatmap of the quantity columns, a gapminder
//! style bubble chart and a world choropleth of total factor productivity.
//!
//! [`Analysis`] ties the steps together; every stage is also usable on its
//! own, e.g. [`normalize::normalize_and_aggregate`] against a synthetic
//! [`Dataset`].

pub mod analysis;
pub mod chart;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod geo;
pub mod normalize;
pub mod stats;

pub use analysis::Analysis;
pub use dataset::{Dataset, Row};
pub use error::{AgroError, AgroResult};
pub use normalize::{normalize_and_aggregate, NormalizeConfig};

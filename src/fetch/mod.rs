use std::fs;
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use tracing::{debug, info};
use url::Url;

use crate::error::{AgroError, AgroResult};

/// Agricultural total factor productivity (USDA), published by Our World in
/// Data. Entity/Year rows with one column per measured index or quantity.
pub const PRODUCTIVITY_URL: &str =
    "https://raw.githubusercontent.com/owid/owid-datasets/master/datasets/\
     Agricultural%20total%20factor%20productivity%20(USDA)/\
     Agricultural%20total%20factor%20productivity%20(USDA).csv";

/// Natural Earth 1:110m country boundaries, as GeoJSON. Used for the
/// choropleth only.
pub const BOUNDARIES_URL: &str =
    "https://raw.githubusercontent.com/nvkelso/natural-earth-vector/master/\
     geojson/ne_110m_admin_0_countries.geojson";

/// Download `url` into `dest` unless the file is already present, and return
/// the local path.
///
/// The cache is create-if-absent: an existing file is reused without
/// touching the network, so repeated calls fetch remotely at most once.
#[tracing::instrument(level = "debug", skip(client, dest), fields(dest = %dest.as_ref().display()))]
pub fn ensure_local(client: &Client, url: &str, dest: impl AsRef<Path>) -> AgroResult<PathBuf> {
    let dest = dest.as_ref();
    if dest.is_file() {
        debug!("cache hit");
        return Ok(dest.to_path_buf());
    }

    let url = Url::parse(url)
        .map_err(|e| AgroError::MissingData(format!("bad source url `{url}`: {e}")))?;

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| AgroError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    info!(%url, "downloading");
    let bytes = client
        .get(url.clone())
        .send()
        .and_then(|resp| resp.error_for_status())
        .and_then(|resp| resp.bytes())
        .map_err(|e| AgroError::MissingData(format!("could not fetch `{url}`: {e}")))?;

    fs::write(dest, &bytes).map_err(|e| AgroError::Io {
        path: dest.to_path_buf(),
        source: e,
    })?;
    info!(bytes = bytes.len(), "saved");

    Ok(dest.to_path_buf())
}

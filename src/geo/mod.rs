use std::fs;
use std::path::Path;
use std::str::FromStr;

use geo::{Geometry, MultiPolygon};
use geojson::GeoJson;
use tracing::info;

use crate::error::{AgroError, AgroResult};
use crate::normalize::NormalizeConfig;

/// A named country outline.
#[derive(Debug, Clone)]
pub struct CountryShape {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// Country boundary geometries for map rendering. Names are passed through
/// the same corrections as the dataset, so shapes and cleaned rows join by
/// name.
#[derive(Debug, Clone)]
pub struct WorldMap {
    shapes: Vec<CountryShape>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

impl WorldMap {
    /// Parse a GeoJSON FeatureCollection of country polygons.
    pub fn from_geojson_file(path: impl AsRef<Path>, config: &NormalizeConfig) -> AgroResult<Self> {
        let path = path.as_ref();
        let txt = fs::read_to_string(path).map_err(|e| AgroError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let raw = GeoJson::from_str(&txt)?;

        let fc = match raw {
            GeoJson::FeatureCollection(fc) => fc,
            _ => {
                return Err(AgroError::Malformed(format!(
                    "`{}` is not a GeoJSON FeatureCollection",
                    path.display()
                )))
            }
        };

        let mut shapes = Vec::new();
        for feature in fc.features {
            let name = match feature_name(&feature) {
                Some(n) => config.canonical(&n).to_string(),
                None => continue,
            };
            let gj = match feature.geometry {
                Some(g) => g,
                None => continue,
            };
            let geom: Geometry<f64> = gj.value.try_into()?;
            let geometry = match geom {
                Geometry::Polygon(p) => p.into(),
                Geometry::MultiPolygon(mp) => mp,
                _ => continue,
            };
            shapes.push(CountryShape { name, geometry });
        }

        let (x_bounds, y_bounds) = bounds_of(&shapes);
        info!(shapes = shapes.len(), path = %path.display(), "loaded country boundaries");
        Ok(Self { shapes, x_bounds, y_bounds })
    }

    pub fn shapes(&self) -> &[CountryShape] {
        &self.shapes
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Longitude extent of all shapes.
    pub fn x_bounds(&self) -> [f64; 2] {
        self.x_bounds
    }

    /// Latitude extent of all shapes.
    pub fn y_bounds(&self) -> [f64; 2] {
        self.y_bounds
    }
}

fn feature_name(feature: &geojson::Feature) -> Option<String> {
    let props = feature.properties.as_ref()?;
    ["ADMIN", "NAME", "name"]
        .iter()
        .find_map(|key| props.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

fn bounds_of(shapes: &[CountryShape]) -> ([f64; 2], [f64; 2]) {
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for shape in shapes {
        for poly in &shape.geometry.0 {
            for coord in poly
                .exterior()
                .0
                .iter()
                .chain(poly.interiors().iter().flat_map(|r| r.0.iter()))
            {
                min_x = min_x.min(coord.x);
                min_y = min_y.min(coord.y);
                max_x = max_x.max(coord.x);
                max_y = max_y.max(coord.y);
            }
        }
    }
    if min_x > max_x {
        // no shapes; fall back to the full lon/lat extent
        return ([-180.0, 180.0], [-90.0, 90.0]);
    }
    ([min_x, max_x], [min_y, max_y])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const FIXTURE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"ADMIN": "Korea, Rep."},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[126.0, 34.0], [130.0, 34.0], [130.0, 39.0], [126.0, 39.0], [126.0, 34.0]]]
                }
            },
            {
                "type": "Feature",
                "properties": {"ADMIN": "No Geometry"},
                "geometry": null
            }
        ]
    }"#;

    fn korea_config() -> NormalizeConfig {
        NormalizeConfig {
            corrections: [("Korea, Rep.".to_string(), "South Korea".to_string())]
                .into_iter()
                .collect(),
            excluded: Default::default(),
        }
    }

    #[test]
    fn parses_features_and_corrects_names() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("countries.geojson");
        fs::write(&path, FIXTURE).unwrap();

        let world = WorldMap::from_geojson_file(&path, &korea_config()).unwrap();

        assert_eq!(world.shapes().len(), 1);
        assert_eq!(world.shapes()[0].name, "South Korea");
        assert_eq!(world.x_bounds(), [126.0, 130.0]);
        assert_eq!(world.y_bounds(), [34.0, 39.0]);
    }

    #[test]
    fn rejects_non_feature_collections() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("point.geojson");
        fs::write(&path, r#"{"type": "Point", "coordinates": [0.0, 0.0]}"#).unwrap();

        let err = WorldMap::from_geojson_file(&path, &NormalizeConfig::default()).unwrap_err();
        assert!(matches!(err, AgroError::Malformed(_)));
    }
}

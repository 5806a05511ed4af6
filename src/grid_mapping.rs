//! CF grid-mapping detection
//!
//! The core does no projection math. It identifies the grid-mapping
//! variable, spells out its PROJ definition so the rendering collaborator
//! can set up its CRS, and exposes the one coordinate conversion needed to
//! georeference geostationary scans.

use crate::catalog::{json_to_f64, json_to_string, Variable};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Variable names commonly used for grid-mapping containers
pub const WELL_KNOWN_MAPPING_VARIABLES: [&str; 7] = [
    "crs",
    "transverse_mercator",
    "projection",
    "lambert_conformal_conic",
    "goes_imager_projection",
    "polar_stereographic",
    "grid_mapping",
];

/// Default GOES-R perspective point height in metres
pub const DEFAULT_PERSPECTIVE_POINT_HEIGHT: f64 = 35_786_023.0;

/// Projection description attached to a variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridMapping {
    /// Name of the container variable holding the attributes
    pub variable: String,
    /// Value of `grid_mapping_name`, e.g. `latitude_longitude`
    pub mapping_name: Option<String>,
    pub attributes: HashMap<String, JsonValue>,
}

impl GridMapping {
    pub fn from_variable(variable: &Variable) -> Self {
        Self {
            variable: variable.name.clone(),
            mapping_name: variable.attribute_str("grid_mapping_name"),
            attributes: variable.attributes.clone(),
        }
    }

    pub fn attribute_f64(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).and_then(json_to_f64)
    }

    pub fn attribute_str(&self, key: &str) -> Option<String> {
        self.attributes.get(key).and_then(json_to_string)
    }

    /// EPSG code when the mapping is identified by one
    pub fn epsg(&self) -> Option<u32> {
        match self.mapping_name.as_deref() {
            Some("latitude_longitude") => Some(4326),
            _ => self
                .attribute_f64("epsg_code")
                .or_else(|| {
                    self.attribute_str("epsg_code")
                        .and_then(|s| s.trim_start_matches("EPSG:").parse().ok())
                })
                .map(|code| code as u32),
        }
    }

    /// PROJ definition built from the CF attributes.
    ///
    /// Missing parameters take the usual CF defaults. `None` for mappings
    /// that are not recognized.
    pub fn proj_string(&self) -> Option<String> {
        let get = |keys: &[&str], default: f64| {
            keys.iter()
                .find_map(|key| self.attribute_f64(key))
                .unwrap_or(default)
        };
        let false_origin = format!(
            "+x_0={} +y_0={}",
            get(&["false_easting"], 0.0),
            get(&["false_northing"], 0.0)
        );
        const TAIL: &str = "+datum=WGS84 +units=m +no_defs";

        if self.is_geostationary() {
            let mut proj = format!(
                "+proj=geos +h={} +lon_0={}",
                get(&["perspective_point_height"], DEFAULT_PERSPECTIVE_POINT_HEIGHT),
                get(&["longitude_of_projection_origin"], 0.0)
            );
            if let Some(sweep) = self.attribute_str("sweep_angle_axis") {
                proj.push_str(&format!(" +sweep={}", sweep));
            }
            return Some(format!("{} {}", proj, TAIL));
        }

        match self.mapping_name.as_deref()? {
            "latitude_longitude" => Some("+proj=longlat +datum=WGS84 +no_defs".to_string()),
            "transverse_mercator" => Some(format!(
                "+proj=tmerc +lat_0={} +lon_0={} +k={} {} {}",
                get(&["latitude_of_projection_origin"], 0.0),
                get(&["longitude_of_central_meridian"], 0.0),
                get(&["scale_factor_at_central_meridian"], 1.0),
                false_origin,
                TAIL
            )),
            "lambert_conformal_conic" => {
                let (lat_1, lat_2) = self.standard_parallels();
                Some(format!(
                    "+proj=lcc +lat_1={} +lat_2={} +lat_0={} +lon_0={} {} {}",
                    lat_1,
                    lat_2,
                    get(&["latitude_of_projection_origin"], 0.0),
                    get(&["longitude_of_central_meridian"], 0.0),
                    false_origin,
                    TAIL
                ))
            }
            "polar_stereographic" => Some(format!(
                "+proj=stere +lat_0={} +lon_0={} +k={} {} {}",
                get(&["latitude_of_projection_origin"], 90.0),
                get(
                    &["longitude_of_projection_origin", "straight_vertical_longitude_from_pole"],
                    0.0
                ),
                get(&["scale_factor_at_projection_origin", "scale_factor"], 1.0),
                false_origin,
                TAIL
            )),
            _ => None,
        }
    }

    /// `standard_parallel` as a pair, or the `_1`/`_2` attributes, or 30/60
    fn standard_parallels(&self) -> (f64, f64) {
        if let Some(JsonValue::Array(items)) = self.attributes.get("standard_parallel") {
            let first = items.first().and_then(json_to_f64);
            let second = items.get(1).and_then(json_to_f64);
            if let Some(first) = first {
                return (first, second.unwrap_or(first));
            }
        }
        if let Some(single) = self.attributes.get("standard_parallel").and_then(json_to_f64) {
            return (single, single);
        }
        (
            self.attribute_f64("standard_parallel_1").unwrap_or(30.0),
            self.attribute_f64("standard_parallel_2").unwrap_or(60.0),
        )
    }

    pub fn is_geostationary(&self) -> bool {
        self.mapping_name.as_deref() == Some("geostationary")
            || self.variable == "goes_imager_projection"
    }

    /// Factor turning native axis coordinates into projected metres.
    ///
    /// Geostationary scans store scan angles in radians; multiplying by the
    /// satellite height gives metres. `None` for every other mapping.
    pub fn coordinate_scale(&self) -> Option<f64> {
        if !self.is_geostationary() {
            return None;
        }
        Some(
            self.attribute_f64("perspective_point_height")
                .unwrap_or(DEFAULT_PERSPECTIVE_POINT_HEIGHT),
        )
    }
}

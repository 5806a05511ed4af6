//! Visualization request handed to the rendering collaborator
//!
//! Plain data only. The renderer applies the color ramp, handles the CRS
//! and composites the raster; nothing here draws anything.

use crate::grid_mapping::GridMapping;
use crate::raster::{AffineTransform, RasterSlice, SpacingWarning};
use serde::{Serialize, Serializer};
use std::str::FromStr;

/// Named color ramps the renderer is expected to know
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorRamp {
    #[default]
    Viridis,
    Grayscale,
    Spectral,
    Temperature,
}

impl ColorRamp {
    pub const ALL: [ColorRamp; 4] = [
        ColorRamp::Viridis,
        ColorRamp::Grayscale,
        ColorRamp::Spectral,
        ColorRamp::Temperature,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Viridis => "viridis",
            Self::Grayscale => "grayscale",
            Self::Spectral => "spectral",
            Self::Temperature => "temperature",
        }
    }
}

impl FromStr for ColorRamp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|ramp| ramp.as_str() == lower || (lower == "greyscale" && *ramp == Self::Grayscale))
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|r| r.as_str()).collect();
                format!("Unknown color ramp '{}', expected one of: {}", s, names.join(", "))
            })
    }
}

/// How values map onto the ramp
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Stretch {
    /// Use the min and max of the unmasked values
    #[default]
    MinMax,
    Explicit { min: f64, max: f64 },
}

impl Stretch {
    /// Concrete (min, max) for a raster. `None` if every cell is masked.
    pub fn resolve(&self, raster: &RasterSlice) -> Option<(f64, f64)> {
        match *self {
            Stretch::MinMax => raster.value_range(),
            Stretch::Explicit { min, max } => Some((min, max)),
        }
    }
}

impl FromStr for Stretch {
    type Err = String;

    /// `"minmax"` or `"<min>:<max>"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("minmax") {
            return Ok(Stretch::MinMax);
        }
        let (min, max) = s
            .split_once(':')
            .ok_or_else(|| "Invalid stretch: expected 'minmax' or '<min>:<max>'".to_string())?;
        let min: f64 = min
            .trim()
            .parse()
            .map_err(|_| format!("Invalid stretch minimum '{}'", min))?;
        let max: f64 = max
            .trim()
            .parse()
            .map_err(|_| format!("Invalid stretch maximum '{}'", max))?;
        if !(min < max) {
            return Err(format!("Stretch minimum {} must be below maximum {}", min, max));
        }
        Ok(Stretch::Explicit { min, max })
    }
}

/// Display configuration with recognized options only
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DisplayHints {
    pub color_ramp: ColorRamp,
    pub stretch: Stretch,
}

/// Everything the renderer needs to show one slice
#[derive(Debug, Clone, Serialize)]
pub struct VisualizationRequest {
    /// Suggested layer name, e.g. `"temperature from data.nc"`
    pub layer_name: String,
    pub variable: String,
    pub units: Option<String>,
    #[serde(serialize_with = "serialize_raster_summary")]
    pub raster: RasterSlice,
    pub hints: DisplayHints,
    /// Resolved stretch bounds, `None` when the raster has no valid cells
    pub value_range: Option<(f64, f64)>,
    pub grid_mapping: Option<GridMapping>,
    pub epsg: Option<u32>,
    /// PROJ definition of the raster's CRS, when the mapping is recognized
    pub proj: Option<String>,
}

impl VisualizationRequest {
    pub fn new(layer_name: impl Into<String>, raster: RasterSlice, hints: DisplayHints) -> Self {
        let value_range = hints.stretch.resolve(&raster);
        Self {
            layer_name: layer_name.into(),
            variable: raster.name.clone(),
            units: raster.units.clone(),
            raster,
            hints,
            value_range,
            grid_mapping: None,
            epsg: None,
            proj: None,
        }
    }

    pub fn with_grid_mapping(mut self, mapping: Option<GridMapping>) -> Self {
        self.epsg = mapping.as_ref().and_then(GridMapping::epsg);
        self.proj = mapping.as_ref().and_then(GridMapping::proj_string);
        self.grid_mapping = mapping;
        self
    }
}

#[derive(Serialize)]
struct RasterSummary<'a> {
    rows: usize,
    cols: usize,
    x_dimension: &'a str,
    y_dimension: &'a str,
    transform: AffineTransform,
    gdal_transform: [f64; 6],
    georeferenced: bool,
    valid_cells: usize,
    no_data: Option<f64>,
    warnings: &'a [SpacingWarning],
}

/// Rasters are summarized, not dumped, when a request is serialized
fn serialize_raster_summary<S: Serializer>(raster: &RasterSlice, serializer: S) -> Result<S::Ok, S::Error> {
    RasterSummary {
        rows: raster.rows(),
        cols: raster.cols(),
        x_dimension: &raster.x_dimension,
        y_dimension: &raster.y_dimension,
        transform: raster.transform,
        gdal_transform: raster.transform.to_gdal(),
        georeferenced: raster.georeferenced,
        valid_cells: raster.valid_count(),
        no_data: raster.no_data,
        warnings: &raster.warnings,
    }
    .serialize(serializer)
}

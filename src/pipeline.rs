//! Catalog → Selector → Extractor → Raster Builder → Visualization Request
//!
//! Each call recomputes from scratch; there is no derived state to go stale
//! between user actions. See [`crate::cache::SliceCache`] for opt-in reuse.

use crate::catalog::{Dataset, Variable};
use crate::data_source::GridSource;
use crate::errors::{AxisRole, NcSliceError, Result};
use crate::extractor::extract;
use crate::raster::{Orientation, RasterBuilder, RasterSlice};
use crate::selector::{resolve, DisplayAxis, ResolvedAxis, Selector, SliceSpec};
use crate::visualization::{DisplayHints, VisualizationRequest};

/// User choices for one visualize action, as plain values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceRequest {
    pub variable: String,
    pub x: DisplayAxis,
    pub y: DisplayAxis,
    pub fixed: Vec<(String, Selector)>,
}

impl SliceRequest {
    pub fn new(variable: impl Into<String>, x: impl Into<DisplayAxis>, y: impl Into<DisplayAxis>) -> Self {
        Self {
            variable: variable.into(),
            x: x.into(),
            y: y.into(),
            fixed: Vec::new(),
        }
    }

    pub fn fix(mut self, dimension: impl Into<String>, selector: Selector) -> Self {
        self.fixed.push((dimension.into(), selector));
        self
    }

    pub fn fix_index(self, dimension: impl Into<String>, index: usize) -> Self {
        self.fix(dimension, Selector::Index(index))
    }
}

/// Options shared by every visualize call of a session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisualizeOptions {
    pub hints: DisplayHints,
    pub orientation: Orientation,
    /// Skip the geostationary scan-angle → metres conversion
    pub keep_native_coordinates: bool,
}

impl<S: GridSource> Dataset<S> {
    /// Validate `request` against the catalog.
    pub fn resolve_slice(&self, request: &SliceRequest) -> Result<SliceSpec> {
        let variable = self.variable(&request.variable)?;
        Ok(resolve(
            variable,
            request.x.clone(),
            request.y.clone(),
            request.fixed.as_slice(),
        )?)
    }
}

/// Extract `spec` and turn it into a raster.
pub fn build_raster<S: GridSource>(
    dataset: &Dataset<S>,
    spec: &SliceSpec,
    options: &VisualizeOptions,
) -> Result<RasterSlice> {
    let variable = dataset.variable(spec.variable())?;
    let sub = extract(dataset, spec)?;

    let scale = if options.keep_native_coordinates {
        None
    } else {
        dataset
            .grid_mapping(variable)
            .and_then(|mapping| mapping.coordinate_scale())
    };
    let x_coords = window_coordinates(dataset, variable, &sub.x, scale);
    let y_coords = window_coordinates(dataset, variable, &sub.y, scale);

    RasterBuilder::for_variable(variable)
        .axis_names(&sub.x.dimension, &sub.y.dimension)
        .orientation(options.orientation)
        .build(&sub.values, x_coords.as_deref(), y_coords.as_deref())
        .map_err(|e| {
            let dimension = match e.axis() {
                AxisRole::X => &sub.x.dimension,
                AxisRole::Y => &sub.y.dimension,
            };
            NcSliceError::georeference(dimension.clone(), e)
        })
}

/// Run the whole pipeline for one user action.
pub fn visualize<S: GridSource>(
    dataset: &Dataset<S>,
    request: &SliceRequest,
    options: &VisualizeOptions,
) -> Result<VisualizationRequest> {
    let spec = dataset.resolve_slice(request)?;
    let raster = build_raster(dataset, &spec, options)?;
    Ok(to_visualization(dataset, raster, options))
}

/// Wrap a finished raster with labels, hints and projection info.
pub fn to_visualization<S: GridSource>(
    dataset: &Dataset<S>,
    raster: RasterSlice,
    options: &VisualizeOptions,
) -> VisualizationRequest {
    let mapping = dataset
        .variable(&raster.name)
        .ok()
        .and_then(|v| dataset.grid_mapping(v));
    let file_name = dataset
        .path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dataset.path().display().to_string());
    let layer_name = format!("{} from {}", raster.name, file_name);

    VisualizationRequest::new(layer_name, raster, options.hints).with_grid_mapping(mapping)
}

/// Coordinates of the selected window of a display axis, optionally scaled
fn window_coordinates<S: GridSource>(
    dataset: &Dataset<S>,
    variable: &Variable,
    axis: &ResolvedAxis,
    scale: Option<f64>,
) -> Option<Vec<f64>> {
    let coords = dataset.coordinate_axis_for(variable, &axis.dimension)?;
    let window = coords.get(axis.range())?;
    Some(match scale {
        Some(factor) => window.iter().map(|c| c * factor).collect(),
        None => window.to_vec(),
    })
}

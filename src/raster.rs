//! Raster building: sub-array + axis coordinates → georeferenced grid
//!
//! # Transform convention
//!
//! [`AffineTransform`] maps pixel *centres*: column `c`, row `r` sits at
//! `(origin_x + c * pixel_width, origin_y + r * pixel_height)`. The origin is
//! therefore the first coordinate pair of the (possibly flipped) axes. Use
//! [`AffineTransform::to_gdal`] for the corner-based six-tuple GDAL-style
//! consumers expect.
//!
//! # Spacing
//!
//! Pixel size is the median absolute delta between adjacent coordinates.
//! Axes whose spacing deviates from the median produce a
//! [`SpacingWarning`] and the exact per-pixel coordinates are carried in the
//! [`RasterSlice`]; nothing is resampled.

use crate::catalog::{Packing, Variable};
use crate::errors::{AxisRole, GeoreferenceError};
use crate::parallel::PARALLEL_CELL_THRESHOLD;
use ndarray::{s, Array2, ArrayView2, Zip};
use serde::Serialize;

/// Relative deviation from the median spacing tolerated before warning
pub const SPACING_TOLERANCE: f64 = 1e-3;

/// Row ordering of the produced raster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Orientation {
    /// Row 0 holds the maximum Y; ascending Y axes are flipped
    #[default]
    NorthUp,
    /// Rows follow the file's Y order
    Native,
}

/// Linear pixel → world mapping (no rotation terms)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AffineTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub origin_y: f64,
    pub pixel_height: f64,
}

impl AffineTransform {
    /// Pixel index space: origin 0, unit spacing
    pub const IDENTITY: Self = Self {
        origin_x: 0.0,
        pixel_width: 1.0,
        origin_y: 0.0,
        pixel_height: 1.0,
    };

    /// World coordinate of a pixel centre
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }

    /// Fractional pixel position of a world coordinate
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }

    /// `[top_left_x, pixel_width, 0, top_left_y, 0, pixel_height]` using
    /// pixel-corner origin.
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x - self.pixel_width / 2.0,
            self.pixel_width,
            0.0,
            self.origin_y - self.pixel_height / 2.0,
            0.0,
            self.pixel_height,
        ]
    }

    /// Outer edges `(min_x, min_y, max_x, max_y)` of a `rows × cols` grid
    pub fn bounds(&self, rows: usize, cols: usize) -> (f64, f64, f64, f64) {
        let [left, pw, _, top, _, ph] = self.to_gdal();
        let right = left + cols as f64 * pw;
        let bottom = top + rows as f64 * ph;
        (
            left.min(right),
            top.min(bottom),
            left.max(right),
            top.max(bottom),
        )
    }
}

/// Non-uniform spacing detected on an axis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpacingWarning {
    pub axis: AxisRole,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl std::fmt::Display for SpacingWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} axis spacing is not uniform (min {}, median {}, max {})",
            self.axis, self.min, self.median, self.max
        )
    }
}

/// A georeferenced 2D grid ready for display
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSlice {
    pub name: String,
    pub units: Option<String>,
    pub x_dimension: String,
    pub y_dimension: String,
    /// Sample values, rows = Y. Masked cells hold NaN.
    pub values: Array2<f64>,
    /// `true` where the sample is missing
    pub mask: Array2<bool>,
    pub transform: AffineTransform,
    /// Coordinate of every column centre
    pub x_coords: Vec<f64>,
    /// Coordinate of every row centre, after any flip
    pub y_coords: Vec<f64>,
    /// Whether coordinates came from the file (vs pixel indices)
    pub georeferenced: bool,
    /// Sentinel in unpacked units, for writers that need one
    pub no_data: Option<f64>,
    pub warnings: Vec<SpacingWarning>,
}

impl RasterSlice {
    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn cols(&self) -> usize {
        self.values.ncols()
    }

    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|m| !**m).count()
    }

    /// Min and max over unmasked cells
    pub fn value_range(&self) -> Option<(f64, f64)> {
        Zip::from(&self.values)
            .and(&self.mask)
            .fold(None, |acc: Option<(f64, f64)>, &v, &masked| {
                if masked {
                    return acc;
                }
                Some(match acc {
                    None => (v, v),
                    Some((lo, hi)) => (lo.min(v), hi.max(v)),
                })
            })
    }

    pub fn is_uniformly_spaced(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Configures and runs raster construction
#[derive(Debug, Clone, Default)]
pub struct RasterBuilder {
    name: String,
    units: Option<String>,
    x_dimension: Option<String>,
    y_dimension: Option<String>,
    no_data: Option<f64>,
    packing: Option<Packing>,
    orientation: Orientation,
}

impl RasterBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Prefill labels, sentinel and packing from catalog metadata
    pub fn for_variable(variable: &Variable) -> Self {
        Self {
            name: variable.name.clone(),
            units: variable.units.clone(),
            no_data: variable.no_data,
            packing: variable.packing,
            ..Self::default()
        }
    }

    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn axis_names(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.x_dimension = Some(x.into());
        self.y_dimension = Some(y.into());
        self
    }

    /// Raw sentinel, compared before unpacking
    pub fn no_data(mut self, sentinel: Option<f64>) -> Self {
        self.no_data = sentinel;
        self
    }

    pub fn packing(mut self, packing: Option<Packing>) -> Self {
        self.packing = packing;
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Build a raster from a [Y, X] sub-array.
    ///
    /// `x` and `y` are the coordinates of the sub-array's columns and rows;
    /// `None` means the axis has no coordinate variable and pixel indices
    /// are used.
    pub fn build(
        &self,
        values: &Array2<f64>,
        x: Option<&[f64]>,
        y: Option<&[f64]>,
    ) -> Result<RasterSlice, GeoreferenceError> {
        let (rows, cols) = values.dim();
        let x_axis = AxisSpacing::derive(AxisRole::X, x, cols)?;
        let mut y_axis = AxisSpacing::derive(AxisRole::Y, y, rows)?;

        let flip = self.orientation == Orientation::NorthUp && y_axis.explicit && y_axis.step > 0.0;
        let source: ArrayView2<f64> = if flip {
            y_axis.coords.reverse();
            y_axis.step = -y_axis.step;
            values.slice(s![..;-1, ..])
        } else {
            values.view()
        };

        let (values, mask) = apply_mask(source, self.no_data, self.packing);

        let transform = match (x_axis.explicit, y_axis.explicit) {
            (false, false) => AffineTransform::IDENTITY,
            _ => AffineTransform {
                origin_x: x_axis.coords.first().copied().unwrap_or(0.0),
                pixel_width: x_axis.step,
                origin_y: y_axis.coords.first().copied().unwrap_or(0.0),
                pixel_height: y_axis.step,
            },
        };

        let warnings: Vec<SpacingWarning> = [x_axis.warning.clone(), y_axis.warning.clone()]
            .into_iter()
            .flatten()
            .collect();
        for warning in &warnings {
            tracing::warn!(variable = %self.name, "{}", warning);
        }

        let no_data = self.no_data.map(|raw| match self.packing {
            Some(p) => p.apply(raw),
            None => raw,
        });

        Ok(RasterSlice {
            name: self.name.clone(),
            units: self.units.clone(),
            x_dimension: self.x_dimension.clone().unwrap_or_else(|| "x".to_string()),
            y_dimension: self.y_dimension.clone().unwrap_or_else(|| "y".to_string()),
            values,
            mask,
            transform,
            x_coords: x_axis.coords,
            y_coords: y_axis.coords,
            georeferenced: x_axis.explicit || y_axis.explicit,
            no_data,
            warnings,
        })
    }
}

/// Build a raster with default labels and north-up orientation.
pub fn build(
    values: &Array2<f64>,
    x: Option<&[f64]>,
    y: Option<&[f64]>,
    no_data: Option<f64>,
) -> Result<RasterSlice, GeoreferenceError> {
    RasterBuilder::default().no_data(no_data).build(values, x, y)
}

/// Validated coordinates of one axis plus its signed pixel size
struct AxisSpacing {
    coords: Vec<f64>,
    step: f64,
    explicit: bool,
    warning: Option<SpacingWarning>,
}

impl AxisSpacing {
    fn derive(axis: AxisRole, coords: Option<&[f64]>, cells: usize) -> Result<Self, GeoreferenceError> {
        let Some(coords) = coords else {
            return Ok(Self {
                coords: (0..cells).map(|i| i as f64).collect(),
                step: 1.0,
                explicit: false,
                warning: None,
            });
        };

        if coords.len() != cells {
            return Err(GeoreferenceError::LengthMismatch {
                axis,
                coords: coords.len(),
                cells,
            });
        }
        if let Some(index) = coords.iter().position(|c| !c.is_finite()) {
            return Err(GeoreferenceError::NonFinite { axis, index });
        }

        let increasing = coords.len() < 2 || coords[1] > coords[0];
        let mut deltas = Vec::with_capacity(coords.len().saturating_sub(1));
        for (i, pair) in coords.windows(2).enumerate() {
            let delta = pair[1] - pair[0];
            let ok = if increasing { delta > 0.0 } else { delta < 0.0 };
            if !ok {
                return Err(GeoreferenceError::NotMonotonic {
                    axis,
                    index: i + 1,
                    previous: pair[0],
                    value: pair[1],
                });
            }
            deltas.push(delta.abs());
        }

        if deltas.is_empty() {
            return Ok(Self {
                coords: coords.to_vec(),
                step: 1.0,
                explicit: true,
                warning: None,
            });
        }

        let median = median(&deltas);
        let min = deltas.iter().copied().fold(f64::INFINITY, f64::min);
        let max = deltas.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let warning = ((max - median).max(median - min) > SPACING_TOLERANCE * median)
            .then(|| SpacingWarning {
                axis,
                median,
                min,
                max,
            });

        Ok(Self {
            coords: coords.to_vec(),
            step: if increasing { median } else { -median },
            explicit: true,
            warning,
        })
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Compute the no-data mask and unpacked values in one pass.
///
/// A cell is masked when it is non-finite or equals the raw sentinel.
fn apply_mask(
    raw: ArrayView2<f64>,
    sentinel: Option<f64>,
    packing: Option<Packing>,
) -> (Array2<f64>, Array2<bool>) {
    let mut values = Array2::<f64>::zeros(raw.raw_dim());
    let mut mask = Array2::<bool>::from_elem(raw.raw_dim(), false);

    let cell = |value: &mut f64, masked: &mut bool, &v: &f64| {
        let missing = !v.is_finite() || sentinel.is_some_and(|s| v == s);
        *masked = missing;
        *value = if missing {
            f64::NAN
        } else {
            packing.map_or(v, |p| p.apply(v))
        };
    };

    let zip = Zip::from(&mut values).and(&mut mask).and(&raw);
    if raw.len() >= PARALLEL_CELL_THRESHOLD {
        zip.par_for_each(cell);
    } else {
        zip.for_each(cell);
    }
    (values, mask)
}

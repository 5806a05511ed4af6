//! Metadata catalog: the in-memory description of a dataset
//!
//! Opening a [`Dataset`] enumerates dimensions and variables once, checks
//! that every variable only references declared dimensions, and loads the
//! 1-D coordinate axis of each dimension that has one, plus any 1-D
//! auxiliary coordinates named by `coordinates` attributes. All of this is cached
//! for the lifetime of the dataset; only slice reads go back to the source.

use crate::data_source::{DataKind, GridSource, VariableDescriptor};
use crate::errors::{NcSliceError, Result};
use crate::grid_mapping::{GridMapping, WELL_KNOWN_MAPPING_VARIABLES};
use crate::netcdf_source::NetCdfSource;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const X_AXIS_NAMES: [&str; 4] = ["x", "lon", "longitude", "projection_x_coordinate"];
const Y_AXIS_NAMES: [&str; 4] = ["y", "lat", "latitude", "projection_y_coordinate"];

/// A named axis with a fixed declared length
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub name: String,
    pub length: usize,
    pub is_unlimited: bool,
    coordinates: Option<Vec<f64>>,
}

impl Dimension {
    /// Real-world coordinate values, if the file declares a coordinate variable
    pub fn coordinates(&self) -> Option<&[f64]> {
        self.coordinates.as_deref()
    }

    pub fn has_coordinates(&self) -> bool {
        self.coordinates.is_some()
    }
}

/// `value * scale_factor + add_offset` unpacking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Packing {
    pub scale_factor: f64,
    pub add_offset: f64,
}

impl Packing {
    /// Read packing attributes. `None` when both are absent or the identity.
    pub fn from_attributes(attributes: &HashMap<String, JsonValue>) -> Option<Self> {
        let scale_factor = attributes.get("scale_factor").and_then(json_to_f64);
        let add_offset = attributes.get("add_offset").and_then(json_to_f64);
        if scale_factor.is_none() && add_offset.is_none() {
            return None;
        }
        let packing = Self {
            scale_factor: scale_factor.unwrap_or(1.0),
            add_offset: add_offset.unwrap_or(0.0),
        };
        (!packing.is_identity()).then_some(packing)
    }

    pub fn is_identity(&self) -> bool {
        self.scale_factor == 1.0 && self.add_offset == 0.0
    }

    #[inline]
    pub fn apply(&self, raw: f64) -> f64 {
        raw * self.scale_factor + self.add_offset
    }
}

/// A named array whose shape is defined by an ordered list of dimensions
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    /// Dimension names in declared order; this is the array axis order
    pub dimensions: Vec<String>,
    /// Length of each referenced dimension, same order as `dimensions`
    pub shape: Vec<usize>,
    pub kind: DataKind,
    /// Raw (packed) sentinel marking missing samples
    pub no_data: Option<f64>,
    pub packing: Option<Packing>,
    pub units: Option<String>,
    pub long_name: Option<String>,
    pub attributes: HashMap<String, JsonValue>,
}

impl Variable {
    fn from_descriptor(descriptor: VariableDescriptor, shape: Vec<usize>) -> Self {
        let attributes = descriptor.attributes;
        let no_data = attributes
            .get("_FillValue")
            .and_then(json_to_f64)
            .or_else(|| attributes.get("missing_value").and_then(json_to_f64));
        let packing = Packing::from_attributes(&attributes);
        let units = attributes.get("units").and_then(json_to_string);
        let long_name = attributes.get("long_name").and_then(json_to_string);

        Self {
            name: descriptor.name,
            dimensions: descriptor.dimensions,
            shape,
            kind: descriptor.kind,
            no_data,
            packing,
            units,
            long_name,
            attributes,
        }
    }

    pub fn ndim(&self) -> usize {
        self.dimensions.len()
    }

    /// Array axis of a dimension
    pub fn axis_of(&self, dimension: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d == dimension)
    }

    /// Declared length of one of this variable's dimensions
    pub fn length_of(&self, dimension: &str) -> Option<usize> {
        self.axis_of(dimension).map(|axis| self.shape[axis])
    }

    pub fn total_elements(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn estimated_size_bytes(&self) -> usize {
        self.total_elements() * self.kind.size_bytes()
    }

    pub fn attribute_str(&self, key: &str) -> Option<String> {
        self.attributes.get(key).and_then(json_to_string)
    }

    /// Long name if present, otherwise the variable name
    pub fn label(&self) -> &str {
        self.long_name.as_deref().unwrap_or(&self.name)
    }
}

/// An opened gridded file. Read-only and immutable for its lifetime.
pub struct Dataset<S: GridSource = NetCdfSource> {
    path: PathBuf,
    dimensions: Vec<Dimension>,
    variables: Vec<Variable>,
    global_attributes: HashMap<String, JsonValue>,
    /// 1-D auxiliary coordinates named by `coordinates` attributes
    auxiliary_axes: HashMap<String, Vec<f64>>,
    source: S,
}

impl Dataset<NetCdfSource> {
    /// Open a NetCDF file and catalog its structure.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = NetCdfSource::open(path)?;
        Self::from_source(path, source)
    }
}

impl<S: GridSource> Dataset<S> {
    /// Catalog any [`GridSource`]. `path` identifies the dataset in messages.
    pub fn from_source(path: impl AsRef<Path>, source: S) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let path_str = path.display().to_string();
        let as_open_error = |e: NcSliceError| match e {
            NcSliceError::Open { .. } => e,
            other => NcSliceError::open(path_str.clone(), other.to_string()),
        };

        let descriptors = source.dimensions().map_err(as_open_error)?;
        let variable_descriptors = source.variables().map_err(as_open_error)?;
        let global_attributes = source.global_attributes().map_err(as_open_error)?;

        let lengths: HashMap<&str, usize> = descriptors
            .iter()
            .map(|d| (d.name.as_str(), d.length))
            .collect();

        let mut variables = Vec::with_capacity(variable_descriptors.len());
        for descriptor in variable_descriptors {
            let mut shape = Vec::with_capacity(descriptor.dimensions.len());
            for dim in &descriptor.dimensions {
                let length = lengths.get(dim.as_str()).ok_or_else(|| {
                    NcSliceError::open(
                        path_str.clone(),
                        format!(
                            "variable '{}' references undeclared dimension '{}'",
                            descriptor.name, dim
                        ),
                    )
                })?;
                shape.push(*length);
            }
            variables.push(Variable::from_descriptor(descriptor, shape));
        }

        let mut dimensions = Vec::with_capacity(descriptors.len());
        for descriptor in &descriptors {
            let coordinates = variables
                .iter()
                .find(|v| {
                    v.name == descriptor.name
                        && v.dimensions.len() == 1
                        && v.dimensions[0] == descriptor.name
                })
                .map(|var| load_axis(&source, var))
                .transpose()
                .map_err(as_open_error)?
                .flatten();
            dimensions.push(Dimension {
                name: descriptor.name.clone(),
                length: descriptor.length,
                is_unlimited: descriptor.is_unlimited,
                coordinates,
            });
        }

        let mut auxiliary_axes: HashMap<String, Vec<f64>> = HashMap::new();
        for variable in &variables {
            for name in auxiliary_names(variable) {
                if auxiliary_axes.contains_key(name) {
                    continue;
                }
                let Some(coord) = variables
                    .iter()
                    .find(|v| v.name == name && v.dimensions.len() == 1)
                else {
                    continue;
                };
                if let Some(values) = load_axis(&source, coord).map_err(as_open_error)? {
                    auxiliary_axes.insert(coord.name.clone(), values);
                }
            }
        }

        tracing::debug!(
            path = %path.display(),
            dimensions = dimensions.len(),
            variables = variables.len(),
            auxiliary_axes = auxiliary_axes.len(),
            "cataloged dataset"
        );

        Ok(Self {
            path,
            dimensions,
            variables,
            global_attributes,
            auxiliary_axes,
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All dimensions in file order
    pub fn list_dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// All variables in file order
    pub fn list_variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn global_attributes(&self) -> &HashMap<String, JsonValue> {
        &self.global_attributes
    }

    pub fn dimension(&self, name: &str) -> Result<&Dimension> {
        self.dimensions
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| NcSliceError::DimensionNotFound {
                dim: name.to_string(),
            })
    }

    pub fn variable(&self, name: &str) -> Result<&Variable> {
        self.variables
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| NcSliceError::VariableNotFound {
                var: name.to_string(),
            })
    }

    /// Coordinate values for a dimension, or `None` when the dimension is
    /// unknown or has no coordinate variable (plain pixel indices then).
    pub fn coordinate_axis(&self, dimension: &str) -> Option<&[f64]> {
        self.dimensions
            .iter()
            .find(|d| d.name == dimension)
            .and_then(Dimension::coordinates)
    }

    /// Coordinate values used to georeference `dimension` of `variable`.
    ///
    /// A 1-D variable over `dimension` listed in the variable's `coordinates`
    /// attribute wins; otherwise the dimension's own coordinate variable.
    pub fn coordinate_axis_for(&self, variable: &Variable, dimension: &str) -> Option<&[f64]> {
        auxiliary_names(variable)
            .filter_map(|name| self.variables.iter().find(|v| v.name == name))
            .filter(|v| v.dimensions.len() == 1 && v.dimensions[0] == dimension)
            .find_map(|v| self.auxiliary_axes.get(&v.name))
            .map(Vec::as_slice)
            .or_else(|| self.coordinate_axis(dimension))
    }

    /// Variables that are not coordinate variables of their own dimension
    pub fn data_variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables
            .iter()
            .filter(|v| !(v.dimensions.len() == 1 && v.dimensions[0] == v.name))
    }

    /// The underlying source, e.g. to inspect a [`crate::memory_source::MemorySource`]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Guess which dimensions of `variable` are the horizontal (X, Y) axes.
    ///
    /// Looks at the `coordinates` attribute, then dimension names and the
    /// `axis` attribute of coordinate variables. Falls back to the last two
    /// dimensions. `None` for variables with fewer than two dimensions.
    pub fn suggest_display_axes(&self, variable: &Variable) -> Option<(String, String)> {
        if variable.ndim() < 2 {
            return None;
        }

        let mut x = None;
        let mut y = None;

        // (dimension, name used to classify it)
        let mut candidates: Vec<(&str, &str)> = Vec::new();
        for name in auxiliary_names(variable) {
            if let Some(dim) = variable.dimensions.iter().find(|d| *d == name) {
                candidates.push((dim.as_str(), dim.as_str()));
            } else if let Some(coord) = self
                .variables
                .iter()
                .find(|v| v.name == name && v.dimensions.len() == 1)
            {
                if variable.dimensions.contains(&coord.dimensions[0]) {
                    candidates.push((coord.dimensions[0].as_str(), coord.name.as_str()));
                }
            }
        }
        candidates.extend(variable.dimensions.iter().map(|d| (d.as_str(), d.as_str())));

        for (dim, name) in candidates {
            let axis_attr = self
                .variables
                .iter()
                .find(|v| v.name == name)
                .and_then(|v| v.attribute_str("axis"));
            let lower = name.to_lowercase();
            if x.is_none() && (X_AXIS_NAMES.contains(&lower.as_str()) || axis_attr.as_deref() == Some("X")) {
                x = Some(dim.to_string());
            } else if y.is_none()
                && (Y_AXIS_NAMES.contains(&lower.as_str()) || axis_attr.as_deref() == Some("Y"))
            {
                y = Some(dim.to_string());
            }
        }

        match (x, y) {
            (Some(x), Some(y)) if x != y => Some((x, y)),
            _ => {
                let n = variable.ndim();
                Some((
                    variable.dimensions[n - 1].clone(),
                    variable.dimensions[n - 2].clone(),
                ))
            }
        }
    }

    /// Find the CF grid mapping describing `variable`'s projection.
    ///
    /// Honors the variable's `grid_mapping` attribute first, then falls back
    /// to variables with well-known projection names.
    pub fn grid_mapping(&self, variable: &Variable) -> Option<GridMapping> {
        let named = variable
            .attribute_str("grid_mapping")
            .and_then(|name| self.variables.iter().find(|v| v.name == name));
        let mapping_var = named.or_else(|| {
            WELL_KNOWN_MAPPING_VARIABLES
                .iter()
                .find_map(|name| self.variables.iter().find(|v| v.name == *name))
        })?;
        Some(GridMapping::from_variable(mapping_var))
    }

    /// Release the underlying handle. Dropping the dataset has the same effect.
    pub fn close(self) {
        tracing::debug!(path = %self.path.display(), "closing dataset");
        drop(self.source);
    }
}

impl<S: GridSource + std::fmt::Debug> std::fmt::Debug for Dataset<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("path", &self.path)
            .field("dimensions", &self.dimensions.len())
            .field("variables", &self.variables.len())
            .field("source", &self.source)
            .finish()
    }
}

/// Names listed in a variable's `coordinates` attribute
fn auxiliary_names(variable: &Variable) -> impl Iterator<Item = &str> {
    variable
        .attributes
        .get("coordinates")
        .and_then(JsonValue::as_str)
        .into_iter()
        .flat_map(str::split_whitespace)
}

/// Read and unpack a numeric 1-D coordinate variable. `None` for
/// non-numeric variables.
fn load_axis<S: GridSource>(source: &S, var: &Variable) -> Result<Option<Vec<f64>>> {
    if !var.kind.is_numeric() || var.shape.len() != 1 {
        return Ok(None);
    }
    let length = var.shape[0];

    let raw = source.read(&var.name, &[0..length])?;
    let values = raw
        .iter()
        .map(|&v| match var.packing {
            Some(p) => p.apply(v),
            None => v,
        })
        .collect::<Vec<_>>();

    if values.len() != length {
        return Err(NcSliceError::read(
            &var.name,
            format!("coordinate axis has {} values, expected {}", values.len(), length),
        ));
    }
    Ok(Some(values))
}

pub(crate) fn json_to_f64(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::Array(items) => items.first().and_then(json_to_f64),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn json_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(json_to_string).collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        }
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

//! NetCDF-backed [`GridSource`]
//!
//! Wraps an open `netcdf::File`. The handle stays open for lazy reads for
//! as long as the source lives and is released when it is dropped.

use crate::data_source::{DataKind, DimensionDescriptor, GridSource, VariableDescriptor};
use crate::errors::{NcSliceError, Result};
use ndarray::{ArrayD, IxDyn};
use netcdf::{AttributeValue, Extent, File};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// A NetCDF file opened read-only
pub struct NetCdfSource {
    path: PathBuf,
    file: File,
}

impl NetCdfSource {
    /// Open `path` read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = netcdf::open(&path)
            .map_err(|e| NcSliceError::open(path.display().to_string(), e.to_string()))?;
        tracing::debug!(path = %path.display(), "opened NetCDF file");
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_error(&self, message: impl Into<String>) -> NcSliceError {
        NcSliceError::open(self.path.display().to_string(), message)
    }
}

impl std::fmt::Debug for NetCdfSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetCdfSource")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl GridSource for NetCdfSource {
    fn dimensions(&self) -> Result<Vec<DimensionDescriptor>> {
        Ok(self
            .file
            .dimensions()
            .map(|d| DimensionDescriptor {
                name: d.name().to_string(),
                length: d.len(),
                is_unlimited: d.is_unlimited(),
            })
            .collect())
    }

    fn variables(&self) -> Result<Vec<VariableDescriptor>> {
        let mut variables = Vec::new();
        for var in self.file.variables() {
            let dimensions = var
                .dimensions()
                .iter()
                .map(|d| d.name().to_string())
                .collect();
            let kind = DataKind::from_type_name(&format!("{:?}", var.vartype()));

            let mut attributes = HashMap::new();
            for attr in var.attributes() {
                let value = attr.value().map_err(|e| {
                    self.open_error(format!(
                        "unreadable attribute '{}' on '{}': {}",
                        attr.name(),
                        var.name(),
                        e
                    ))
                })?;
                attributes.insert(attr.name().to_string(), attribute_to_json(value));
            }

            variables.push(VariableDescriptor {
                name: var.name().to_string(),
                dimensions,
                kind,
                attributes,
            });
        }
        Ok(variables)
    }

    fn global_attributes(&self) -> Result<HashMap<String, JsonValue>> {
        let mut attributes = HashMap::new();
        for attr in self.file.attributes() {
            match attr.value() {
                Ok(value) => {
                    attributes.insert(attr.name().to_string(), attribute_to_json(value));
                }
                Err(e) => {
                    tracing::debug!(attribute = %attr.name(), error = %e, "skipping unreadable global attribute");
                }
            }
        }
        Ok(attributes)
    }

    fn read(&self, variable: &str, ranges: &[Range<usize>]) -> Result<ArrayD<f64>> {
        let var = self
            .file
            .variable(variable)
            .ok_or_else(|| NcSliceError::VariableNotFound {
                var: variable.to_string(),
            })?;

        let extents: Vec<Extent> = ranges.iter().cloned().map(Extent::from).collect();
        let counts: Vec<usize> = ranges.iter().map(|r| r.len()).collect();

        let values: Vec<f64> = var
            .get_values::<f64, _>(extents.as_slice())
            .map_err(|e| NcSliceError::read(variable, e.to_string()))?;

        ArrayD::from_shape_vec(IxDyn(&counts), values).map_err(|e| {
            NcSliceError::read(
                variable,
                format!("decoded values do not match requested shape {:?}: {}", counts, e),
            )
        })
    }
}

/// Convert a NetCDF attribute into a JSON value.
///
/// Scalars map to numbers or strings, vectors to arrays. Non-finite floats
/// become `null` because JSON cannot represent them.
pub fn attribute_to_json(value: AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Str(s) => JsonValue::from(s),
        AttributeValue::Strs(ss) => JsonValue::from(ss),
        AttributeValue::Float(v) => JsonValue::from(v),
        AttributeValue::Floats(vs) => JsonValue::from(vs),
        AttributeValue::Double(v) => JsonValue::from(v),
        AttributeValue::Doubles(vs) => JsonValue::from(vs),
        AttributeValue::Int(v) => JsonValue::from(v),
        AttributeValue::Ints(vs) => JsonValue::from(vs),
        AttributeValue::Short(v) => JsonValue::from(v),
        AttributeValue::Shorts(vs) => JsonValue::from(vs),
        AttributeValue::Schar(v) => JsonValue::from(v),
        AttributeValue::Schars(vs) => JsonValue::from(vs),
        AttributeValue::Uchar(v) => JsonValue::from(v),
        AttributeValue::Uchars(vs) => JsonValue::from(vs),
        AttributeValue::Ushort(v) => JsonValue::from(v),
        AttributeValue::Ushorts(vs) => JsonValue::from(vs),
        AttributeValue::Uint(v) => JsonValue::from(v),
        AttributeValue::Uints(vs) => JsonValue::from(vs),
        AttributeValue::Longlong(v) => JsonValue::from(v),
        AttributeValue::Longlongs(vs) => JsonValue::from(vs),
        AttributeValue::Ulonglong(v) => JsonValue::from(v),
        AttributeValue::Ulonglongs(vs) => JsonValue::from(vs),
    }
}

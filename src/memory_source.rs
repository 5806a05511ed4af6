//! In-memory [`GridSource`]
//!
//! Useful for hosts that already hold their arrays and for tests. Every
//! call to [`GridSource::read`] is counted so callers can check that a slice
//! was served by a single bounded request.

use crate::data_source::{DataKind, DimensionDescriptor, GridSource, VariableDescriptor};
use crate::errors::{NcSliceError, Result};
use ndarray::{ArrayD, Slice};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
struct MemoryVariable {
    descriptor: VariableDescriptor,
    data: ArrayD<f64>,
}

/// A dataset held entirely in memory
#[derive(Debug, Default)]
pub struct MemorySource {
    dimensions: Vec<DimensionDescriptor>,
    variables: Vec<MemoryVariable>,
    global_attributes: HashMap<String, JsonValue>,
    failing: Option<String>,
    reads: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a fixed-length dimension
    pub fn with_dimension(mut self, name: &str, length: usize) -> Self {
        self.dimensions.push(DimensionDescriptor {
            name: name.to_string(),
            length,
            is_unlimited: false,
        });
        self
    }

    /// Add a variable stored as `f64`.
    ///
    /// The array shape is not checked against the declared dimensions here;
    /// the catalog does that when the dataset is opened.
    pub fn with_variable(self, name: &str, dimensions: &[&str], data: ArrayD<f64>) -> Self {
        self.with_typed_variable(name, dimensions, DataKind::F64, data)
    }

    /// Add a variable with an explicit on-disk kind
    pub fn with_typed_variable(
        mut self,
        name: &str,
        dimensions: &[&str],
        kind: DataKind,
        data: ArrayD<f64>,
    ) -> Self {
        self.variables.push(MemoryVariable {
            descriptor: VariableDescriptor {
                name: name.to_string(),
                dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
                kind,
                attributes: HashMap::new(),
            },
            data,
        });
        self
    }

    /// Add a 1-D coordinate variable named after its dimension
    pub fn with_coordinate(self, dimension: &str, values: &[f64]) -> Self {
        let data = ArrayD::from_shape_vec(vec![values.len()], values.to_vec())
            .unwrap_or_else(|_| ArrayD::zeros(vec![0]));
        self.with_variable(dimension, &[dimension], data)
    }

    /// Attach an attribute to a previously added variable
    pub fn with_attribute(mut self, variable: &str, key: &str, value: impl Into<JsonValue>) -> Self {
        if let Some(var) = self
            .variables
            .iter_mut()
            .find(|v| v.descriptor.name == variable)
        {
            var.descriptor
                .attributes
                .insert(key.to_string(), value.into());
        }
        self
    }

    pub fn with_global_attribute(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.global_attributes.insert(key.to_string(), value.into());
        self
    }

    /// Make every read of `variable` fail, to exercise error paths
    pub fn with_failing_reads(mut self, variable: &str) -> Self {
        self.failing = Some(variable.to_string());
        self
    }

    /// Number of `read` calls served so far
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl GridSource for MemorySource {
    fn dimensions(&self) -> Result<Vec<DimensionDescriptor>> {
        Ok(self.dimensions.clone())
    }

    fn variables(&self) -> Result<Vec<VariableDescriptor>> {
        Ok(self
            .variables
            .iter()
            .map(|v| v.descriptor.clone())
            .collect())
    }

    fn global_attributes(&self) -> Result<HashMap<String, JsonValue>> {
        Ok(self.global_attributes.clone())
    }

    fn read(&self, variable: &str, ranges: &[Range<usize>]) -> Result<ArrayD<f64>> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        if self.failing.as_deref() == Some(variable) {
            return Err(NcSliceError::read(variable, "simulated read failure"));
        }

        let var = self
            .variables
            .iter()
            .find(|v| v.descriptor.name == variable)
            .ok_or_else(|| NcSliceError::VariableNotFound {
                var: variable.to_string(),
            })?;

        if ranges.len() != var.data.ndim() {
            return Err(NcSliceError::read(
                variable,
                format!(
                    "expected {} ranges, got {}",
                    var.data.ndim(),
                    ranges.len()
                ),
            ));
        }
        for (axis, (range, &len)) in ranges.iter().zip(var.data.shape()).enumerate() {
            if range.start > range.end || range.end > len {
                return Err(NcSliceError::read(
                    variable,
                    format!("range {:?} exceeds axis {} of length {}", range, axis, len),
                ));
            }
        }

        let view = var.data.slice_each_axis(|ax| {
            let r = &ranges[ax.axis.index()];
            Slice::from(r.start..r.end)
        });
        Ok(view.to_owned())
    }
}

//! Slice extraction: one bounded read, then reorder to [Y, X]
//!
//! Files declare dimensions in any order, e.g. `(time, level, lat, lon)` or
//! `(lon, lat, time)`. The index tuple is built by dimension name in the
//! variable's declared order and the two remaining axes are permuted so the
//! result is always laid out rows = Y, columns = X.

use crate::catalog::Dataset;
use crate::data_source::GridSource;
use crate::errors::{NcSliceError, Result, SelectionError};
use crate::selector::{ResolvedAxis, SliceSpec};
use ndarray::{Array2, Axis, Ix2};
use std::ops::Range;

/// Raw values of one slice, laid out [Y, X]
#[derive(Debug, Clone, PartialEq)]
pub struct SubArray {
    pub variable: String,
    pub values: Array2<f64>,
    pub x: ResolvedAxis,
    pub y: ResolvedAxis,
}

impl SubArray {
    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }
}

/// Fetch the sub-array described by `spec`.
///
/// Issues exactly one read against the dataset's source. Either the full
/// sub-array is returned or the call fails; nothing is cached or mutated,
/// so repeating a failed call is safe.
pub fn extract<S: GridSource>(dataset: &Dataset<S>, spec: &SliceSpec) -> Result<SubArray> {
    let variable = dataset.variable(spec.variable())?;
    let x = spec.x();
    let y = spec.y();

    let mut ranges: Vec<Range<usize>> = Vec::with_capacity(variable.ndim());
    let mut fixed_axes = Vec::new();
    for (axis, dim) in variable.dimensions.iter().enumerate() {
        let range = if *dim == x.dimension {
            x.range()
        } else if *dim == y.dimension {
            y.range()
        } else if let Some(index) = spec.fixed_index(dim) {
            fixed_axes.push(axis);
            index..index + 1
        } else {
            return Err(SelectionError::MissingSelector {
                dimension: dim.clone(),
            }
            .into());
        };
        if range.end > variable.shape[axis] {
            return Err(SelectionError::IndexOutOfRange {
                dimension: dim.clone(),
                index: range.end - 1,
                length: variable.shape[axis],
            }
            .into());
        }
        ranges.push(range);
    }

    let x_axis = variable
        .axis_of(&x.dimension)
        .ok_or_else(|| NcSliceError::DimensionNotFound {
            dim: x.dimension.clone(),
        })?;
    let y_axis = variable
        .axis_of(&y.dimension)
        .ok_or_else(|| NcSliceError::DimensionNotFound {
            dim: y.dimension.clone(),
        })?;

    tracing::debug!(variable = %variable.name, ?ranges, "reading slice");
    let raw = dataset.source().read(&variable.name, &ranges)?;

    let expected: Vec<usize> = ranges.iter().map(|r| r.len()).collect();
    if raw.shape() != expected.as_slice() {
        return Err(NcSliceError::read(
            &variable.name,
            format!(
                "source returned shape {:?}, requested {:?}",
                raw.shape(),
                expected
            ),
        ));
    }

    // Drop fixed axes from the highest index down so lower indices stay valid.
    let mut reduced = raw;
    for &axis in fixed_axes.iter().rev() {
        reduced = reduced.index_axis_move(Axis(axis), 0);
    }

    let grid = reduced
        .into_dimensionality::<Ix2>()
        .map_err(|e| NcSliceError::read(&variable.name, e.to_string()))?;
    // After dropping fixed axes the two display axes keep their native order.
    let grid = if x_axis < y_axis {
        grid.reversed_axes()
    } else {
        grid
    };

    Ok(SubArray {
        variable: variable.name.clone(),
        values: grid.as_standard_layout().into_owned(),
        x: x.clone(),
        y: y.clone(),
    })
}

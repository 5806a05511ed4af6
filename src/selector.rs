//! Dimension selector: turns user choices into a validated [`SliceSpec`]
//!
//! All validation happens here, so the extractor can rely on every
//! `SliceSpec` being satisfiable against the variable it was resolved for.

use crate::catalog::Variable;
use crate::errors::SelectionError;
use serde::Serialize;
use std::collections::HashSet;
use std::str::FromStr;

/// Pins a non-display dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Selector {
    Index(usize),
    /// Closed range `[start, end]`
    Range { start: usize, end: usize },
}

impl FromStr for Selector {
    type Err = String;

    /// Parses `"3"` or `"2:5"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| format!("Invalid index '{}'", part))
        };
        match s.split_once(':') {
            Some((start, end)) => Ok(Selector::Range {
                start: parse(start)?,
                end: parse(end)?,
            }),
            None => Ok(Selector::Index(parse(s)?)),
        }
    }
}

/// A dimension mapped onto raster rows or columns, optionally windowed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayAxis {
    pub dimension: String,
    /// Closed index window `[start, end]`; `None` means the full extent
    pub window: Option<(usize, usize)>,
}

impl DisplayAxis {
    pub fn full(dimension: impl Into<String>) -> Self {
        Self {
            dimension: dimension.into(),
            window: None,
        }
    }

    pub fn windowed(dimension: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            dimension: dimension.into(),
            window: Some((start, end)),
        }
    }
}

impl From<&str> for DisplayAxis {
    fn from(dimension: &str) -> Self {
        Self::full(dimension)
    }
}

impl From<String> for DisplayAxis {
    fn from(dimension: String) -> Self {
        Self::full(dimension)
    }
}

/// A display axis after validation: a half-open index range `start..end`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedAxis {
    pub dimension: String,
    pub start: usize,
    pub end: usize,
}

impl ResolvedAxis {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// A non-display dimension pinned to one index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FixedDimension {
    pub dimension: String,
    pub index: usize,
}

/// A validated slice request. Only [`resolve`] constructs one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SliceSpec {
    variable: String,
    x: ResolvedAxis,
    y: ResolvedAxis,
    fixed: Vec<FixedDimension>,
}

impl SliceSpec {
    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn x(&self) -> &ResolvedAxis {
        &self.x
    }

    pub fn y(&self) -> &ResolvedAxis {
        &self.y
    }

    /// Fixed dimensions in the variable's declared order
    pub fn fixed(&self) -> &[FixedDimension] {
        &self.fixed
    }

    pub fn fixed_index(&self, dimension: &str) -> Option<usize> {
        self.fixed
            .iter()
            .find(|f| f.dimension == dimension)
            .map(|f| f.index)
    }

    /// Output raster shape as (rows, columns)
    pub fn raster_shape(&self) -> (usize, usize) {
        (self.y.len(), self.x.len())
    }
}

/// Validate user choices against `variable` and build a [`SliceSpec`].
///
/// Checks run in this order:
/// 1. both display axes are dimensions of the variable and are distinct;
/// 2. every other dimension has a fixed selector;
/// 3. no display axis is also fixed, selectors only name the variable's
///    dimensions, and no dimension is fixed twice;
/// 4. indices, ranges and windows lie within the declared lengths.
pub fn resolve<K: AsRef<str>>(
    variable: &Variable,
    x: impl Into<DisplayAxis>,
    y: impl Into<DisplayAxis>,
    fixed: &[(K, Selector)],
) -> Result<SliceSpec, SelectionError> {
    let x = x.into();
    let y = y.into();

    for axis in [&x, &y] {
        if variable.axis_of(&axis.dimension).is_none() {
            return Err(SelectionError::UnknownDisplayAxis {
                variable: variable.name.clone(),
                dimension: axis.dimension.clone(),
            });
        }
    }
    if x.dimension == y.dimension {
        return Err(SelectionError::DuplicateDisplayAxis {
            dimension: x.dimension.clone(),
        });
    }

    for dim in &variable.dimensions {
        if *dim == x.dimension || *dim == y.dimension {
            continue;
        }
        if !fixed.iter().any(|(name, _)| name.as_ref() == dim) {
            return Err(SelectionError::MissingSelector {
                dimension: dim.clone(),
            });
        }
    }

    let mut seen = HashSet::new();
    for (name, _) in fixed {
        let name = name.as_ref();
        if name == x.dimension || name == y.dimension {
            return Err(SelectionError::DisplayAxisFixed {
                dimension: name.to_string(),
            });
        }
        if variable.axis_of(name).is_none() {
            return Err(SelectionError::UnknownDimension {
                variable: variable.name.clone(),
                dimension: name.to_string(),
            });
        }
        if !seen.insert(name) {
            return Err(SelectionError::DuplicateSelector {
                dimension: name.to_string(),
            });
        }
    }

    let x = resolve_axis(variable, &x)?;
    let y = resolve_axis(variable, &y)?;

    let mut resolved = Vec::with_capacity(fixed.len());
    for dim in &variable.dimensions {
        let Some((_, selector)) = fixed.iter().find(|(name, _)| name.as_ref() == dim) else {
            continue;
        };
        let length = variable.length_of(dim).unwrap_or(0);
        let index = match *selector {
            Selector::Index(index) => {
                check_bound(dim, index, length)?;
                index
            }
            Selector::Range { start, end } => {
                if start > end {
                    return Err(SelectionError::ReversedRange {
                        dimension: dim.clone(),
                        start,
                        end,
                    });
                }
                check_bound(dim, end, length)?;
                if start != end {
                    return Err(SelectionError::NonScalarRange {
                        dimension: dim.clone(),
                        start,
                        end,
                    });
                }
                start
            }
        };
        resolved.push(FixedDimension {
            dimension: dim.clone(),
            index,
        });
    }

    let spec = SliceSpec {
        variable: variable.name.clone(),
        x,
        y,
        fixed: resolved,
    };
    tracing::trace!(?spec, "resolved slice");
    Ok(spec)
}

fn resolve_axis(variable: &Variable, axis: &DisplayAxis) -> Result<ResolvedAxis, SelectionError> {
    let length = variable.length_of(&axis.dimension).unwrap_or(0);
    if length == 0 {
        return Err(SelectionError::EmptyDisplayAxis {
            dimension: axis.dimension.clone(),
        });
    }
    let (start, end) = match axis.window {
        None => (0, length),
        Some((start, end)) => {
            if start > end {
                return Err(SelectionError::ReversedRange {
                    dimension: axis.dimension.clone(),
                    start,
                    end,
                });
            }
            check_bound(&axis.dimension, end, length)?;
            (start, end + 1)
        }
    };
    Ok(ResolvedAxis {
        dimension: axis.dimension.clone(),
        start,
        end,
    })
}

fn check_bound(dimension: &str, index: usize, length: usize) -> Result<(), SelectionError> {
    if index >= length {
        return Err(SelectionError::IndexOutOfRange {
            dimension: dimension.to_string(),
            index,
            length,
        });
    }
    Ok(())
}

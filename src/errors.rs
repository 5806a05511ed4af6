//! Centralized error handling for ncslice
//!
//! Every failure carries enough context (path, variable, dimension, axis,
//! bound) for a host to render a precise message without re-deriving it.
//! The taxonomy follows the four pipeline stages: opening a dataset,
//! validating a selection, reading a slice and georeferencing it.

use serde::Serialize;
use thiserror::Error;

/// Main error type for ncslice operations
#[derive(Error, Debug)]
pub enum NcSliceError {
    /// File unreadable or structure not recognized. Fatal for that file.
    #[error("Cannot open '{path}': {message}")]
    Open { path: String, message: String },

    /// Invalid user selection. Recoverable: the caller should correct it.
    #[error("Invalid selection: {0}")]
    Selection(#[from] SelectionError),

    /// I/O or decode failure during extraction. Safe to retry.
    #[error("Failed to read variable '{variable}': {message}")]
    Read { variable: String, message: String },

    /// Malformed coordinate axis, with the dimension it belongs to
    #[error("Georeference error on '{dimension}': {source}")]
    Georeference {
        dimension: String,
        #[source]
        source: GeoreferenceError,
    },

    /// Variable not found in dataset
    #[error("Variable '{var}' not found in dataset")]
    VariableNotFound { var: String },

    /// Dimension not found in dataset
    #[error("Dimension '{dim}' not found in dataset")]
    DimensionNotFound { dim: String },

    /// Writing a raster to disk failed
    #[error("Export failed: {0}")]
    Export(String),

    /// NetCDF library errors outside of open/read (e.g. while exporting)
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] netcdf::Error),

    /// I/O operation errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Array shape or dimension error
    #[error("Array error: {0}")]
    Array(#[from] ndarray::ShapeError),

    /// Thread pool configuration error
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// A background task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Worker(String),
}

impl NcSliceError {
    /// Build an [`NcSliceError::Open`] for a path
    pub fn open(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Open {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Build an [`NcSliceError::Read`] for a variable
    pub fn read(variable: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Read {
            variable: variable.into(),
            message: message.into(),
        }
    }

    /// Attach the offending dimension name to a georeference failure
    pub fn georeference(dimension: impl Into<String>, source: GeoreferenceError) -> Self {
        Self::Georeference {
            dimension: dimension.into(),
            source,
        }
    }

    /// Whether retrying the identical request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Io(_) | Self::Worker(_))
    }
}

/// Rejections produced by the dimension selector.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("display axis '{dimension}' is not a dimension of variable '{variable}'")]
    UnknownDisplayAxis { variable: String, dimension: String },

    #[error("display axes must be distinct, got '{dimension}' twice")]
    DuplicateDisplayAxis { dimension: String },

    #[error("dimension '{dimension}' needs a fixed index or range")]
    MissingSelector { dimension: String },

    #[error("dimension '{dimension}' is a display axis and cannot also be fixed")]
    DisplayAxisFixed { dimension: String },

    #[error("dimension '{dimension}' is not a dimension of variable '{variable}'")]
    UnknownDimension { variable: String, dimension: String },

    #[error("dimension '{dimension}' has more than one fixed selector")]
    DuplicateSelector { dimension: String },

    #[error("index {index} is out of range for dimension '{dimension}' (bound {length})")]
    IndexOutOfRange {
        dimension: String,
        index: usize,
        length: usize,
    },

    #[error("range {start}:{end} is reversed for dimension '{dimension}'")]
    ReversedRange {
        dimension: String,
        start: usize,
        end: usize,
    },

    #[error("range {start}:{end} on fixed dimension '{dimension}' must select a single index")]
    NonScalarRange {
        dimension: String,
        start: usize,
        end: usize,
    },

    #[error("display axis '{dimension}' has length 0")]
    EmptyDisplayAxis { dimension: String },
}

impl SelectionError {
    /// Name of the dimension the rejection is about
    pub fn dimension(&self) -> &str {
        match self {
            Self::UnknownDisplayAxis { dimension, .. }
            | Self::DuplicateDisplayAxis { dimension }
            | Self::MissingSelector { dimension }
            | Self::DisplayAxisFixed { dimension }
            | Self::UnknownDimension { dimension, .. }
            | Self::DuplicateSelector { dimension }
            | Self::IndexOutOfRange { dimension, .. }
            | Self::ReversedRange { dimension, .. }
            | Self::NonScalarRange { dimension, .. }
            | Self::EmptyDisplayAxis { dimension } => dimension,
        }
    }
}

/// Which display axis a georeference problem concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AxisRole {
    X,
    Y,
}

impl std::fmt::Display for AxisRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AxisRole::X => write!(f, "X"),
            AxisRole::Y => write!(f, "Y"),
        }
    }
}

/// Malformed coordinate axes. The builder never fabricates coordinates.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoreferenceError {
    #[error("{axis} axis is not strictly monotonic at index {index} ({previous} then {value})")]
    NotMonotonic {
        axis: AxisRole,
        index: usize,
        previous: f64,
        value: f64,
    },

    #[error("{axis} axis has {coords} coordinates but the slice has {cells} cells along it")]
    LengthMismatch {
        axis: AxisRole,
        coords: usize,
        cells: usize,
    },

    #[error("{axis} axis has a non-finite coordinate at index {index}")]
    NonFinite { axis: AxisRole, index: usize },
}

impl GeoreferenceError {
    /// The offending axis
    pub fn axis(&self) -> AxisRole {
        match self {
            Self::NotMonotonic { axis, .. }
            | Self::LengthMismatch { axis, .. }
            | Self::NonFinite { axis, .. } => *axis,
        }
    }
}

impl From<GeoreferenceError> for NcSliceError {
    fn from(source: GeoreferenceError) -> Self {
        Self::georeference(source.axis().to_string(), source)
    }
}

/// Result type alias for ncslice operations
pub type Result<T> = std::result::Result<T, NcSliceError>;

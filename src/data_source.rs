//! Data source abstraction for gridded files
//!
//! The slicing engine never talks to a file-format library directly. It
//! depends on [`GridSource`], which exposes dimension and variable
//! enumeration plus a bounded hyperslab read. [`crate::netcdf_source`]
//! implements it on top of libnetcdf and [`crate::memory_source`] on top of
//! in-memory arrays.

use crate::errors::Result;
use ndarray::ArrayD;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::ops::Range;

/// Numeric kind of a variable as stored on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    /// Strings, chars, compound and other non-numeric types
    Other,
}

impl DataKind {
    /// Parse a type description such as `"int(i16)"`, `"float(f32)"` or `"short"`.
    ///
    /// Matching is by substring so that both the current and older
    /// libnetcdf binding spellings are understood.
    pub fn from_type_name(name: &str) -> Self {
        let name = name.to_lowercase();
        let has = |keys: &[&str]| keys.iter().any(|k| name.contains(k));

        if has(&["f64", "double"]) {
            Self::F64
        } else if has(&["f32", "float"]) {
            Self::F32
        } else if has(&["u64", "ulonglong"]) {
            Self::U64
        } else if has(&["i64", "longlong", "int64"]) {
            Self::I64
        } else if has(&["u32", "uint"]) {
            Self::U32
        } else if has(&["u16", "ushort"]) {
            Self::U16
        } else if has(&["u8", "ubyte", "uchar"]) {
            Self::U8
        } else if has(&["i32"]) {
            Self::I32
        } else if has(&["i16", "short"]) {
            Self::I16
        } else if has(&["i8", "schar", "byte"]) {
            Self::I8
        } else if has(&["int"]) {
            Self::I32
        } else {
            Self::Other
        }
    }

    /// Whether values of this kind can be read as numbers
    pub fn is_numeric(self) -> bool {
        !matches!(self, Self::Other)
    }

    /// Storage size of one element in bytes
    pub fn size_bytes(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
            Self::Other => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::I8 => "int8",
            Self::U8 => "uint8",
            Self::I16 => "int16",
            Self::U16 => "uint16",
            Self::I32 => "int32",
            Self::U32 => "uint32",
            Self::I64 => "int64",
            Self::U64 => "uint64",
            Self::F32 => "float32",
            Self::F64 => "float64",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dimension as enumerated by a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionDescriptor {
    pub name: String,
    pub length: usize,
    pub is_unlimited: bool,
}

/// A variable as enumerated by a source
#[derive(Debug, Clone)]
pub struct VariableDescriptor {
    pub name: String,
    /// Dimension names in declared (array axis) order
    pub dimensions: Vec<String>,
    pub kind: DataKind,
    pub attributes: HashMap<String, JsonValue>,
}

/// Read-only access to a gridded dataset.
///
/// Implementations must be safe for repeated, independent reads: `read`
/// takes `&self` and must not depend on state left behind by earlier calls.
pub trait GridSource {
    /// All dimensions, in file order
    fn dimensions(&self) -> Result<Vec<DimensionDescriptor>>;

    /// All variables, in file order
    fn variables(&self) -> Result<Vec<VariableDescriptor>>;

    /// Global (file-level) attributes
    fn global_attributes(&self) -> Result<HashMap<String, JsonValue>>;

    /// Read one hyperslab of `variable` as `f64`.
    ///
    /// `ranges` has one entry per dimension of the variable, in declared
    /// order. The result has shape `ranges[i].len()` along axis `i`. This is
    /// a single bounded request; implementations must not fall back to
    /// reading the whole variable.
    fn read(&self, variable: &str, ranges: &[Range<usize>]) -> Result<ArrayD<f64>>;
}

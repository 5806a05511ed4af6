//! ncslice: dimension indexing and slice extraction for NetCDF variables
//!
//! Turns a selection over an N-dimensional gridded variable into a
//! georeferenced 2D raster plus the display request a map renderer needs.
//!
//! ## Pipeline
//!
//! Catalog → Selector → Extractor → Raster Builder → Visualization Request
//!
//! - [`catalog`]: opens a file once and caches dimensions, variables and
//!   coordinate axes
//! - [`selector`]: validates display axes and fixed indices into a
//!   [`SliceSpec`](selector::SliceSpec)
//! - [`extractor`]: performs one bounded read and reorders to `[Y, X]`
//! - [`raster`]: derives the affine transform and the no-data mask
//! - [`visualization`]: wraps the raster with labels and display hints
//!
//! [`pipeline::visualize`] runs all stages for one user action. Each call
//! recomputes from scratch; [`cache::SliceCache`] is available when repeated
//! selections are common, and [`worker`] moves the work off an event loop.
//!
//! ## Usage
//! ```rust,no_run
//! use ncslice::prelude::*;
//!
//! let dataset = Dataset::open("data.nc").unwrap();
//! let request = SliceRequest::new("temperature", "lon", "lat").fix_index("time", 0);
//! let layer = visualize(&dataset, &request, &VisualizeOptions::default()).unwrap();
//! println!("{} {:?}", layer.layer_name, layer.raster.transform);
//! ```
//!
//! Any other storage can be plugged in by implementing
//! [`GridSource`](data_source::GridSource) and calling
//! [`Dataset::from_source`](catalog::Dataset::from_source).

pub mod cache;
pub mod catalog;
pub mod data_source;
pub mod errors;
pub mod export;
pub mod extractor;
pub mod grid_mapping;
pub mod memory_source;
pub mod metadata;
pub mod netcdf_source;
pub mod parallel;
pub mod pipeline;
pub mod raster;
pub mod selector;
pub mod visualization;
pub mod worker;

pub use errors::{NcSliceError, Result};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::cache::SliceCache;
    pub use crate::catalog::{Dataset, Dimension, Variable};
    pub use crate::data_source::GridSource;
    pub use crate::errors::{GeoreferenceError, NcSliceError, Result, SelectionError};
    pub use crate::export::{write_raster_to_netcdf, RasterWriter};
    pub use crate::extractor::{extract, SubArray};
    pub use crate::memory_source::MemorySource;
    pub use crate::netcdf_source::NetCdfSource;
    pub use crate::parallel::ParallelConfig;
    pub use crate::pipeline::{build_raster, visualize, SliceRequest, VisualizeOptions};
    pub use crate::raster::{AffineTransform, Orientation, RasterBuilder, RasterSlice};
    pub use crate::selector::{resolve, DisplayAxis, Selector, SliceSpec};
    pub use crate::visualization::{ColorRamp, DisplayHints, Stretch, VisualizationRequest};
    pub use crate::worker::{visualize_all, visualize_in_background};
}

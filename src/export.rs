//! Write a raster slice to a standalone NetCDF file
//!
//! The output holds the 2D values in raster orientation, one coordinate
//! variable per display axis, a `_FillValue`, the variable's units and a
//! `history` attribute. Hosts that hand rasters to a file-based renderer
//! use this instead of keeping the source file open.

use crate::errors::{NcSliceError, Result};
use crate::raster::RasterSlice;
use chrono::Utc;
use ndarray::ArrayView1;
use netcdf::create;
use std::{fs, path::Path};

/// Fill value used when the source variable declares none
pub const DEFAULT_EXPORT_FILL: f64 = -9999.0;

/// Writes rasters to NetCDF
pub struct RasterWriter<'a> {
    output_path: &'a Path,
    source_name: Option<String>,
}

impl<'a> RasterWriter<'a> {
    pub fn new(output_path: &'a Path) -> Self {
        Self {
            output_path,
            source_name: None,
        }
    }

    /// Name of the file the raster came from, recorded in `history`
    pub fn source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    /// Write `raster`, replacing any existing file at the output path.
    pub fn write(&self, raster: &RasterSlice) -> Result<()> {
        if raster.x_dimension == raster.y_dimension {
            return Err(NcSliceError::Export(format!(
                "display axes share the name '{}'",
                raster.x_dimension
            )));
        }
        if self.output_path.exists() {
            fs::remove_file(self.output_path)?;
        }

        let mut file = create(self.output_path)?;
        let (rows, cols) = raster.shape();

        file.add_dimension(&raster.y_dimension, rows)?;
        file.add_dimension(&raster.x_dimension, cols)?;

        {
            let mut x_var = file.add_variable::<f64>(&raster.x_dimension, &[raster.x_dimension.as_str()])?;
            if !raster.georeferenced {
                x_var.put_attribute("long_name", "column index")?;
            }
            x_var.put(ArrayView1::from(raster.x_coords.as_slice()), ..)?;
        }
        {
            let mut y_var = file.add_variable::<f64>(&raster.y_dimension, &[raster.y_dimension.as_str()])?;
            if !raster.georeferenced {
                y_var.put_attribute("long_name", "row index")?;
            }
            y_var.put(ArrayView1::from(raster.y_coords.as_slice()), ..)?;
        }

        let fill = raster.no_data.unwrap_or(DEFAULT_EXPORT_FILL);
        let filled = raster.values.mapv(|v| if v.is_nan() { fill } else { v });

        let mut var = file.add_variable::<f64>(
            &raster.name,
            &[raster.y_dimension.as_str(), raster.x_dimension.as_str()],
        )?;
        var.put_attribute("_FillValue", fill)?;
        if let Some(units) = &raster.units {
            var.put_attribute("units", units.as_str())?;
        }
        var.put(filled.view(), ..)?;

        let origin = self
            .source_name
            .as_deref()
            .map(|name| format!(" from {}", name))
            .unwrap_or_default();
        file.add_attribute(
            "history",
            format!(
                "Slice of '{}'{} created by ncslice on {}",
                raster.name,
                origin,
                Utc::now().to_rfc3339()
            ),
        )?;

        tracing::debug!(path = %self.output_path.display(), rows, cols, "exported raster");
        Ok(())
    }
}

/// Convenience wrapper around [`RasterWriter`].
pub fn write_raster_to_netcdf(raster: &RasterSlice, output_path: &Path) -> Result<()> {
    RasterWriter::new(output_path).write(raster)
}

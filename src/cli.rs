//! Defines command-line interface options using `clap` for the ncslice binary.

use clap::Parser;
use ncslice::selector::Selector;
use ncslice::visualization::{ColorRamp, Stretch};
use std::path::PathBuf;

/// Inspect NetCDF files and extract 2D display slices
#[derive(Parser, Debug)]
#[command(
    version,
    name = "ncslice",
    about = "Slice multi-dimensional NetCDF variables into georeferenced rasters"
)]
pub struct Args {
    /// Path to the NetCDF file
    #[arg(short, long)]
    pub file: PathBuf,

    /// List all dimensions, variables and projection info
    #[arg(long)]
    pub list: bool,

    /// Describe a specific variable (data type, shape, and attributes)
    #[arg(long)]
    pub describe: Option<String>,

    /// Variable to slice
    #[arg(short, long)]
    pub variable: Option<String>,

    /// Dimension shown along raster columns. Guessed when omitted.
    #[arg(long)]
    pub x: Option<String>,

    /// Dimension shown along raster rows. Guessed when omitted.
    #[arg(long)]
    pub y: Option<String>,

    /// Pin a non-display dimension, formatted as <dim>=<index> or <dim>=<start>:<end>
    #[arg(long = "fix", value_parser = parse_fix_arg)]
    pub fix: Vec<(String, Selector)>,

    /// Restrict the X axis to a closed index window <start>:<end>
    #[arg(long, value_parser = parse_window_arg)]
    pub x_window: Option<(usize, usize)>,

    /// Restrict the Y axis to a closed index window <start>:<end>
    #[arg(long, value_parser = parse_window_arg)]
    pub y_window: Option<(usize, usize)>,

    /// Color ramp hint: viridis, grayscale, spectral or temperature
    #[arg(long, default_value = "viridis")]
    pub color_ramp: ColorRamp,

    /// Stretch hint: minmax or <min>:<max>
    #[arg(long, default_value = "minmax")]
    pub stretch: Stretch,

    /// Keep rows in file order instead of flipping to north-up
    #[arg(long)]
    pub native_orientation: bool,

    /// Path to save the raster as NetCDF
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Print the visualization request as JSON
    #[arg(long)]
    pub json: bool,

    /// Number of threads to use for parallel processing. Defaults to number of CPU cores.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Log filter, e.g. `info` or `ncslice=debug`. Overrides RUST_LOG.
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn parse_fix_arg(s: &str) -> Result<(String, Selector), String> {
    let (dim, selector) = s
        .split_once('=')
        .ok_or_else(|| "Invalid format: Expected '<dimension>=<index>' or '<dimension>=<start>:<end>'.".to_string())?;
    let dim = dim.trim();
    if dim.is_empty() {
        return Err("Dimension name must not be empty".to_string());
    }
    Ok((dim.to_string(), selector.parse()?))
}

pub fn parse_window_arg(s: &str) -> Result<(usize, usize), String> {
    match s.parse::<Selector>()? {
        Selector::Range { start, end } => Ok((start, end)),
        Selector::Index(_) => Err("Invalid format: Expected '<start>:<end>'.".to_string()),
    }
}

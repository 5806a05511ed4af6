//! Entry point for the ncslice binary.
//! Handles CLI parsing, dataset loading, and dispatches listing, description and slicing.

use clap::Parser;
use ncslice::catalog::Dataset;
use ncslice::export::RasterWriter;
use ncslice::metadata::{describe_dataset, describe_variable, displayable_variables};
use ncslice::parallel::ParallelConfig;
use ncslice::pipeline::{visualize, SliceRequest, VisualizeOptions};
use ncslice::raster::Orientation;
use ncslice::selector::DisplayAxis;
use ncslice::visualization::{DisplayHints, VisualizationRequest};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Args;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = match &args.log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let parallel = args
        .threads
        .map(ParallelConfig::with_threads)
        .unwrap_or_else(ParallelConfig::all_cores);
    parallel.setup_global_pool()?;
    tracing::debug!(threads = parallel.current_threads(), "thread pool ready");

    let dataset = Dataset::open(&args.file)?;
    tracing::info!(file = %args.file.display(), "opened dataset");

    if args.list {
        print!("{}", describe_dataset(&dataset));
    }
    if let Some(name) = &args.describe {
        print!("{}", describe_variable(&dataset, name)?);
    }

    let Some(var_name) = &args.variable else {
        if !args.list && args.describe.is_none() {
            print!("{}", describe_dataset(&dataset));
            let names: Vec<&str> = displayable_variables(&dataset)
                .iter()
                .map(|v| v.name.as_str())
                .collect();
            if !names.is_empty() {
                println!("\nTip: use --variable <name> to slice one of: {}", names.join(", "));
            }
        }
        dataset.close();
        return Ok(());
    };

    let variable = dataset.variable(var_name)?;
    let suggested = dataset.suggest_display_axes(variable);
    let (x_dim, y_dim) = match (&args.x, &args.y, suggested) {
        (Some(x), Some(y), _) => (x.clone(), y.clone()),
        (x, y, Some((sx, sy))) => (x.clone().unwrap_or(sx), y.clone().unwrap_or(sy)),
        (_, _, None) => {
            return Err(format!(
                "variable '{}' has fewer than two dimensions; nothing to display",
                var_name
            )
            .into())
        }
    };

    let x = match args.x_window {
        Some((start, end)) => DisplayAxis::windowed(x_dim, start, end),
        None => DisplayAxis::full(x_dim),
    };
    let y = match args.y_window {
        Some((start, end)) => DisplayAxis::windowed(y_dim, start, end),
        None => DisplayAxis::full(y_dim),
    };

    let mut request = SliceRequest::new(var_name.clone(), x, y);
    for (dim, selector) in &args.fix {
        request = request.fix(dim.clone(), *selector);
    }

    let options = VisualizeOptions {
        hints: DisplayHints {
            color_ramp: args.color_ramp,
            stretch: args.stretch,
        },
        orientation: if args.native_orientation {
            Orientation::Native
        } else {
            Orientation::NorthUp
        },
        keep_native_coordinates: false,
    };

    let result = visualize(&dataset, &request, &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }

    if let Some(output_path) = &args.export {
        let source_name = args
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        RasterWriter::new(output_path)
            .source_name(source_name)
            .write(&result.raster)?;
        println!("✅ Saved raster to {}", output_path.display());
    }

    dataset.close();
    Ok(())
}

fn print_summary(request: &VisualizationRequest) {
    let raster = &request.raster;
    println!("\n Layer: {}", request.layer_name);
    println!("=========={}", "=".repeat(request.layer_name.len()));
    println!(
        "    Shape: {} rows ({}) × {} cols ({})",
        raster.rows(),
        raster.y_dimension,
        raster.cols(),
        raster.x_dimension
    );
    if let Some(units) = &request.units {
        println!("    Units: {}", units);
    }
    let t = raster.transform;
    if raster.georeferenced {
        println!(
            "    Origin: ({}, {})  pixel size: ({}, {})",
            t.origin_x, t.origin_y, t.pixel_width, t.pixel_height
        );
        let (min_x, min_y, max_x, max_y) = t.bounds(raster.rows(), raster.cols());
        println!("    Bounds: x [{}, {}], y [{}, {}]", min_x, max_x, min_y, max_y);
    } else {
        println!("    No coordinate variables; using pixel indices");
    }
    if let Some(code) = request.epsg {
        println!("    CRS: EPSG:{}", code);
    }
    if let Some(proj) = &request.proj {
        println!("    PROJ: {}", proj);
    }
    println!(
        "    Valid cells: {} of {}",
        raster.valid_count(),
        raster.rows() * raster.cols()
    );
    match request.value_range {
        Some((lo, hi)) => println!(
            "    Stretch: {} .. {}  ramp: {}",
            lo,
            hi,
            request.hints.color_ramp.as_str()
        ),
        None => println!("    All cells are no-data"),
    }
    for warning in &raster.warnings {
        println!("    ⚠ {}", warning);
    }
}

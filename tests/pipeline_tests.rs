//! End-to-end tests of the slicing pipeline over in-memory datasets

use ncslice::cache::SliceCache;
use ncslice::catalog::Dataset;
use ncslice::errors::{NcSliceError, SelectionError};
use ncslice::extractor::extract;
use ncslice::memory_source::MemorySource;
use ncslice::pipeline::{build_raster, visualize, SliceRequest, VisualizeOptions};
use ncslice::raster::Orientation;
use ncslice::selector::DisplayAxis;
use ncslice::visualization::{ColorRamp, DisplayHints, Stretch};
use ncslice::worker::{visualize_all, visualize_in_background};
use ndarray::{Array2, ArrayD, IxDyn};
use std::sync::Arc;

/// temperature(time=5, lat=3, lon=4) with value t*100 + lat*10 + lon
fn temperature_data() -> ArrayD<f64> {
    ArrayD::from_shape_fn(IxDyn(&[5, 3, 4]), |ix| (ix[0] * 100 + ix[1] * 10 + ix[2]) as f64)
}

fn temperature_source(lat: &[f64]) -> MemorySource {
    MemorySource::new()
        .with_dimension("time", 5)
        .with_dimension("lat", 3)
        .with_dimension("lon", 4)
        .with_variable("temperature", &["time", "lat", "lon"], temperature_data())
        .with_attribute("temperature", "units", "K")
        .with_coordinate("lat", lat)
        .with_coordinate("lon", &[0.0, 1.0, 2.0, 3.0])
}

fn temperature_dataset() -> Dataset<MemorySource> {
    Dataset::from_source("climate.nc", temperature_source(&[30.0, 20.0, 10.0])).expect("catalog")
}

#[test]
fn test_end_to_end_slice_matches_fixed_time() {
    let dataset = temperature_dataset();
    let request = SliceRequest::new("temperature", "lon", "lat").fix_index("time", 2);

    let layer = visualize(&dataset, &request, &VisualizeOptions::default()).expect("visualize");
    let raster = &layer.raster;

    assert_eq!(raster.shape(), (3, 4));
    let expected = Array2::from_shape_fn((3, 4), |(lat, lon)| (200 + lat * 10 + lon) as f64);
    assert_eq!(raster.values, expected);

    assert_eq!(raster.transform.origin_x, 0.0);
    assert_eq!(raster.transform.pixel_width, 1.0);
    assert_eq!(raster.transform.origin_y, 30.0);
    assert_eq!(raster.transform.pixel_height, -10.0);
    assert_eq!(raster.x_dimension, "lon");
    assert_eq!(raster.y_dimension, "lat");

    assert_eq!(layer.layer_name, "temperature from climate.nc");
    assert_eq!(layer.units.as_deref(), Some("K"));
    assert_eq!(layer.value_range, Some((200.0, 223.0)));
}

#[test]
fn test_shape_does_not_depend_on_fixed_index() {
    let dataset = temperature_dataset();
    for t in 0..5 {
        let request = SliceRequest::new("temperature", "lon", "lat").fix_index("time", t);
        let spec = dataset.resolve_slice(&request).expect("valid");
        let sub = extract(&dataset, &spec).expect("extract");
        assert_eq!(sub.shape(), (3, 4));
        assert_eq!(sub.values[[0, 0]], (t * 100) as f64);
    }
}

#[test]
fn test_repeated_extraction_is_identical() {
    let dataset = temperature_dataset();
    let request = SliceRequest::new("temperature", "lon", "lat").fix_index("time", 4);
    let options = VisualizeOptions::default();

    let first = visualize(&dataset, &request, &options).expect("first");
    let second = visualize(&dataset, &request, &options).expect("second");
    assert_eq!(first.raster, second.raster);
}

#[test]
fn test_extraction_issues_one_read() {
    let dataset = temperature_dataset();
    let spec = dataset
        .resolve_slice(&SliceRequest::new("temperature", "lon", "lat").fix_index("time", 1))
        .expect("valid");

    let before = dataset.source().read_count();
    extract(&dataset, &spec).expect("extract");
    assert_eq!(dataset.source().read_count(), before + 1);
}

#[test]
fn test_window_reads_only_the_window() {
    let dataset = temperature_dataset();
    let request = SliceRequest::new("temperature", DisplayAxis::windowed("lon", 1, 2), "lat")
        .fix_index("time", 0);

    let layer = visualize(&dataset, &request, &VisualizeOptions::default()).expect("visualize");
    let raster = &layer.raster;
    assert_eq!(raster.shape(), (3, 2));
    assert_eq!(raster.values[[0, 0]], 1.0);
    assert_eq!(raster.x_coords, vec![1.0, 2.0]);
    assert_eq!(raster.transform.origin_x, 1.0);
}

#[test]
fn test_lon_lat_file_order_is_transposed() {
    // data(lon=4, lat=3, time=2) = lon*100 + lat*10 + time
    let data = ArrayD::from_shape_fn(IxDyn(&[4, 3, 2]), |ix| (ix[0] * 100 + ix[1] * 10 + ix[2]) as f64);
    let source = MemorySource::new()
        .with_dimension("lon", 4)
        .with_dimension("lat", 3)
        .with_dimension("time", 2)
        .with_variable("sst", &["lon", "lat", "time"], data);
    let dataset = Dataset::from_source("sst.nc", source).expect("catalog");

    let request = SliceRequest::new("sst", "lon", "lat").fix_index("time", 1);
    let layer = visualize(&dataset, &request, &VisualizeOptions::default()).expect("visualize");

    let expected = Array2::from_shape_fn((3, 4), |(lat, lon)| (lon * 100 + lat * 10 + 1) as f64);
    assert_eq!(layer.raster.values, expected);
    assert!(!layer.raster.georeferenced);
}

#[test]
fn test_ascending_latitudes_flip_north_up() {
    let dataset = Dataset::from_source("climate.nc", temperature_source(&[10.0, 20.0, 30.0])).expect("catalog");
    let request = SliceRequest::new("temperature", "lon", "lat").fix_index("time", 0);

    let north_up = visualize(&dataset, &request, &VisualizeOptions::default()).expect("north up");
    assert_eq!(north_up.raster.values[[0, 0]], 20.0);
    assert_eq!(north_up.raster.transform.origin_y, 30.0);
    assert_eq!(north_up.raster.transform.pixel_height, -10.0);

    let options = VisualizeOptions {
        orientation: Orientation::Native,
        ..VisualizeOptions::default()
    };
    let native = visualize(&dataset, &request, &options).expect("native");
    assert_eq!(native.raster.values[[0, 0]], 0.0);
    assert_eq!(native.raster.transform.pixel_height, 10.0);
}

#[test]
fn test_missing_selector_is_a_selection_error() {
    let dataset = temperature_dataset();
    let request = SliceRequest::new("temperature", "lon", "lat");

    match visualize(&dataset, &request, &VisualizeOptions::default()) {
        Err(NcSliceError::Selection(SelectionError::MissingSelector { dimension })) => {
            assert_eq!(dimension, "time");
        }
        other => panic!("Expected MissingSelector, got {:?}", other.map(|l| l.layer_name)),
    }
}

#[test]
fn test_unknown_variable() {
    let dataset = temperature_dataset();
    let request = SliceRequest::new("salinity", "lon", "lat");
    let err = visualize(&dataset, &request, &VisualizeOptions::default()).unwrap_err();
    assert!(matches!(err, NcSliceError::VariableNotFound { ref var } if var == "salinity"));
}

#[test]
fn test_read_failure_is_retryable() {
    let source = temperature_source(&[30.0, 20.0, 10.0]).with_failing_reads("temperature");
    let dataset = Dataset::from_source("climate.nc", source).expect("catalog");
    let request = SliceRequest::new("temperature", "lon", "lat").fix_index("time", 0);

    let err = visualize(&dataset, &request, &VisualizeOptions::default()).unwrap_err();
    assert!(matches!(err, NcSliceError::Read { .. }));
    assert!(err.is_retryable());
}

#[test]
fn test_fill_value_is_masked_end_to_end() {
    let mut data = temperature_data();
    data[IxDyn(&[2, 0, 0])] = -999.0;
    let source = MemorySource::new()
        .with_dimension("time", 5)
        .with_dimension("lat", 3)
        .with_dimension("lon", 4)
        .with_variable("temperature", &["time", "lat", "lon"], data)
        .with_attribute("temperature", "_FillValue", -999.0);
    let dataset = Dataset::from_source("climate.nc", source).expect("catalog");

    let options = VisualizeOptions {
        hints: DisplayHints {
            color_ramp: ColorRamp::Temperature,
            stretch: Stretch::MinMax,
        },
        ..VisualizeOptions::default()
    };
    let request = SliceRequest::new("temperature", "lon", "lat").fix_index("time", 2);
    let layer = visualize(&dataset, &request, &options).expect("visualize");

    assert!(layer.raster.mask[[0, 0]]);
    assert!(layer.raster.values[[0, 0]].is_nan());
    assert_eq!(layer.raster.valid_count(), 11);
    assert_eq!(layer.value_range, Some((201.0, 223.0)));
    assert_eq!(layer.hints.color_ramp, ColorRamp::Temperature);
}

#[test]
fn test_non_monotonic_coordinates_name_the_dimension() {
    let dataset = Dataset::from_source("climate.nc", temperature_source(&[10.0, 30.0, 20.0])).expect("catalog");
    let request = SliceRequest::new("temperature", "lon", "lat").fix_index("time", 0);

    match visualize(&dataset, &request, &VisualizeOptions::default()) {
        Err(NcSliceError::Georeference { dimension, .. }) => assert_eq!(dimension, "lat"),
        other => panic!("Expected Georeference error, got {:?}", other.map(|l| l.layer_name)),
    }
}

#[test]
fn test_geostationary_coordinates_are_scaled() {
    let source = MemorySource::new()
        .with_dimension("y", 2)
        .with_dimension("x", 3)
        .with_variable("Rad", &["y", "x"], ArrayD::zeros(IxDyn(&[2, 3])))
        .with_attribute("Rad", "grid_mapping", "goes_imager_projection")
        .with_variable("goes_imager_projection", &[], ArrayD::zeros(IxDyn(&[])))
        .with_attribute("goes_imager_projection", "grid_mapping_name", "geostationary")
        .with_attribute("goes_imager_projection", "perspective_point_height", 1000.0)
        .with_coordinate("y", &[0.002, 0.001])
        .with_coordinate("x", &[0.001, 0.002, 0.003]);
    let dataset = Dataset::from_source("goes.nc", source).expect("catalog");
    let request = SliceRequest::new("Rad", "x", "y");

    let layer = visualize(&dataset, &request, &VisualizeOptions::default()).expect("visualize");
    assert!((layer.raster.x_coords[2] - 3.0).abs() < 1e-9);
    assert!((layer.raster.transform.pixel_width - 1.0).abs() < 1e-9);
    assert!((layer.raster.transform.origin_y - 2.0).abs() < 1e-9);
    let mapping = layer.grid_mapping.expect("grid mapping");
    assert_eq!(mapping.mapping_name.as_deref(), Some("geostationary"));
    assert_eq!(layer.epsg, None);
    assert_eq!(
        layer.proj.as_deref(),
        Some("+proj=geos +h=1000 +lon_0=0 +datum=WGS84 +units=m +no_defs")
    );

    let options = VisualizeOptions {
        keep_native_coordinates: true,
        ..VisualizeOptions::default()
    };
    let native = visualize(&dataset, &request, &options).expect("visualize");
    assert!((native.raster.x_coords[2] - 0.003).abs() < 1e-12);
}

#[test]
fn test_auxiliary_coordinates_georeference_the_slice() {
    let source = MemorySource::new()
        .with_dimension("ncols", 3)
        .with_dimension("nrows", 2)
        .with_variable(
            "sst",
            &["ncols", "nrows"],
            ArrayD::from_shape_fn(IxDyn(&[3, 2]), |ix| (ix[0] * 10 + ix[1]) as f64),
        )
        .with_attribute("sst", "coordinates", "lat lon")
        .with_variable("lon", &["ncols"], ArrayD::from_shape_vec(IxDyn(&[3]), vec![140.0, 142.0, 144.0]).expect("lon"))
        .with_variable("lat", &["nrows"], ArrayD::from_shape_vec(IxDyn(&[2]), vec![-30.0, -35.0]).expect("lat"));
    let dataset = Dataset::from_source("sst.nc", source).expect("catalog");
    let sst = dataset.variable("sst").expect("sst");

    assert!(dataset.coordinate_axis("ncols").is_none());
    assert_eq!(
        dataset.coordinate_axis_for(sst, "ncols"),
        Some(&[140.0, 142.0, 144.0][..])
    );
    assert_eq!(
        dataset.suggest_display_axes(sst),
        Some(("ncols".to_string(), "nrows".to_string()))
    );

    let layer = visualize(
        &dataset,
        &SliceRequest::new("sst", "ncols", "nrows"),
        &VisualizeOptions::default(),
    )
    .expect("visualize");
    let raster = &layer.raster;
    assert!(raster.georeferenced);
    assert_eq!(raster.shape(), (2, 3));
    assert_eq!(raster.x_coords, vec![140.0, 142.0, 144.0]);
    assert_eq!(raster.y_coords, vec![-30.0, -35.0]);
    assert!((raster.transform.pixel_width - 2.0).abs() < 1e-9);
    assert!((raster.transform.pixel_height + 5.0).abs() < 1e-9);
    assert_eq!(raster.values[[1, 2]], 21.0);
}

#[test]
fn test_cache_serves_repeated_specs() {
    let dataset = temperature_dataset();
    let cache = SliceCache::new(2);
    let options = VisualizeOptions::default();
    let spec = dataset
        .resolve_slice(&SliceRequest::new("temperature", "lon", "lat").fix_index("time", 3))
        .expect("valid");

    let reads = dataset.source().read_count();
    let first = cache.get_or_build(&dataset, &spec, &options).expect("miss");
    let second = cache.get_or_build(&dataset, &spec, &options).expect("hit");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(dataset.source().read_count(), reads + 1);
    assert_eq!((cache.hits(), cache.misses()), (1, 1));
    assert_eq!(*first, build_raster(&dataset, &spec, &options).expect("direct"));
}

#[test]
fn test_cache_evicts_least_recently_used() {
    let dataset = temperature_dataset();
    let cache = SliceCache::new(2);
    let options = VisualizeOptions::default();

    for t in 0..3 {
        let spec = dataset
            .resolve_slice(&SliceRequest::new("temperature", "lon", "lat").fix_index("time", t))
            .expect("valid");
        cache.get_or_build(&dataset, &spec, &options).expect("build");
    }
    assert_eq!(cache.len(), 2);

    cache.clear();
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_background_visualize() {
    let dataset = Arc::new(temperature_dataset());
    let request = SliceRequest::new("temperature", "lon", "lat").fix_index("time", 1);

    let layer = visualize_in_background(Arc::clone(&dataset), request, VisualizeOptions::default())
        .await
        .expect("background visualize");
    assert_eq!(layer.raster.values[[2, 3]], 123.0);
}

#[tokio::test]
async fn test_visualize_all_keeps_request_order() {
    let dataset = Arc::new(temperature_dataset());
    let requests = vec![
        SliceRequest::new("temperature", "lon", "lat").fix_index("time", 0),
        SliceRequest::new("temperature", "lon", "lat").fix_index("time", 9),
        SliceRequest::new("temperature", "lon", "lat").fix_index("time", 4),
    ];

    let results = visualize_all(dataset, requests, VisualizeOptions::default()).await;
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().expect("first").raster.values[[0, 0]], 0.0);
    assert!(matches!(
        results[1],
        Err(NcSliceError::Selection(SelectionError::IndexOutOfRange { index: 9, .. }))
    ));
    assert_eq!(results[2].as_ref().expect("third").raster.values[[0, 0]], 400.0);
}

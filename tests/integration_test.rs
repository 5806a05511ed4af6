use ncslice::catalog::Dataset;
use ncslice::errors::NcSliceError;
use ncslice::export::write_raster_to_netcdf;
use ncslice::pipeline::{visualize, SliceRequest, VisualizeOptions};
use ndarray::{Array1, Array3};
use netcdf::{create, open};
use std::path::Path;
use tempfile::tempdir;

/// temperature(time=2, lat=3, lon=4) = t*100 + lat*10 + lon, with one fill cell
fn write_sample(path: &Path) {
    let mut file = create(path).expect("Failed to create NetCDF file");

    file.add_attribute("title", "Integration sample")
        .expect("Failed to add global attribute");
    file.add_dimension("time", 2)
        .expect("Failed to add dimension time");
    file.add_dimension("lat", 3)
        .expect("Failed to add dimension lat");
    file.add_dimension("lon", 4)
        .expect("Failed to add dimension lon");

    {
        let mut lat = file
            .add_variable::<f64>("lat", &["lat"])
            .expect("Failed to add lat");
        lat.put_attribute("units", "degrees_north")
            .expect("Failed to add lat units");
        lat.put(Array1::from(vec![30.0, 20.0, 10.0]).view(), ..)
            .expect("Failed to write lat");
    }
    {
        let mut lon = file
            .add_variable::<f64>("lon", &["lon"])
            .expect("Failed to add lon");
        lon.put_attribute("units", "degrees_east")
            .expect("Failed to add lon units");
        lon.put(Array1::from(vec![100.0, 101.0, 102.0, 103.0]).view(), ..)
            .expect("Failed to write lon");
    }
    {
        let mut crs = file
            .add_variable::<i32>("crs", &[])
            .expect("Failed to add crs");
        crs.put_attribute("grid_mapping_name", "latitude_longitude")
            .expect("Failed to add grid_mapping_name");
    }
    {
        let mut var = file
            .add_variable::<f32>("temperature", &["time", "lat", "lon"])
            .expect("Failed to add temperature");
        var.put_attribute("units", "K")
            .expect("Failed to add units");
        var.put_attribute("_FillValue", -999.0f32)
            .expect("Failed to add fill value");
        var.put_attribute("grid_mapping", "crs")
            .expect("Failed to add grid_mapping");

        let mut data = Array3::from_shape_fn((2, 3, 4), |(t, y, x)| (t * 100 + y * 10 + x) as f32);
        data[[1, 1, 2]] = -999.0;
        var.put(data.view(), ..)
            .expect("Failed to write temperature");
    }
}

#[test]
fn test_catalog_reads_structure() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("sample.nc");
    write_sample(&file_path);

    let dataset = Dataset::open(&file_path).expect("Failed to open dataset");

    assert_eq!(dataset.list_dimensions().len(), 3);
    assert_eq!(dataset.dimension("lon").expect("lon").length, 4);
    assert_eq!(dataset.coordinate_axis("lat"), Some(&[30.0, 20.0, 10.0][..]));
    assert!(dataset.coordinate_axis("time").is_none());

    let var = dataset.variable("temperature").expect("temperature");
    assert_eq!(var.dimensions, vec!["time", "lat", "lon"]);
    assert_eq!(var.shape, vec![2, 3, 4]);
    assert!(var.kind.is_numeric());
    assert_eq!(var.no_data, Some(-999.0));
    assert_eq!(var.units.as_deref(), Some("K"));

    assert_eq!(
        dataset.suggest_display_axes(var),
        Some(("lon".to_string(), "lat".to_string()))
    );
    let mapping = dataset.grid_mapping(var).expect("grid mapping");
    assert_eq!(mapping.variable, "crs");
    assert_eq!(mapping.epsg(), Some(4326));

    let data_vars: Vec<&str> = dataset.data_variables().map(|v| v.name.as_str()).collect();
    assert!(data_vars.contains(&"temperature"));
    assert!(!data_vars.contains(&"lat"));

    assert!(dataset.global_attributes().contains_key("title"));
    dataset.close();
}

#[test]
fn test_open_missing_file_fails() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let result = Dataset::open(temp_dir.path().join("missing.nc"));
    assert!(matches!(result, Err(NcSliceError::Open { .. })));
}

#[test]
fn test_slice_and_export_round_trip() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("sample.nc");
    let output_path = temp_dir.path().join("slice.nc");
    write_sample(&file_path);

    let dataset = Dataset::open(&file_path).expect("Failed to open dataset");
    let request = SliceRequest::new("temperature", "lon", "lat").fix_index("time", 1);
    let layer = visualize(&dataset, &request, &VisualizeOptions::default()).expect("visualize");
    let raster = &layer.raster;

    assert_eq!(raster.shape(), (3, 4));
    assert_eq!(raster.values[[0, 0]], 100.0);
    assert_eq!(raster.values[[2, 3]], 123.0);
    assert!(raster.mask[[1, 2]]);
    assert_eq!(raster.valid_count(), 11);
    assert_eq!(raster.transform.origin_x, 100.0);
    assert_eq!(raster.transform.origin_y, 30.0);
    assert_eq!(raster.transform.pixel_height, -10.0);
    assert_eq!(layer.epsg, Some(4326));
    assert_eq!(layer.layer_name, "temperature from sample.nc");

    write_raster_to_netcdf(raster, &output_path).expect("export");

    let exported = open(&output_path).expect("Failed to open export");
    let var = exported.variable("temperature").expect("exported variable");
    let dims: Vec<String> = var.dimensions().iter().map(|d| d.name().to_string()).collect();
    assert_eq!(dims, vec!["lat", "lon"]);
    let values: Vec<f64> = var.get_values::<f64, _>(..).expect("read export");
    assert_eq!(values.len(), 12);
    assert_eq!(values[0], 100.0);
    assert_eq!(values[4 + 2], -999.0);

    let lat: Vec<f64> = exported
        .variable("lat")
        .expect("lat")
        .get_values::<f64, _>(..)
        .expect("read lat");
    assert_eq!(lat, vec![30.0, 20.0, 10.0]);
    drop(exported);

    let reopened = Dataset::open(&output_path).expect("reopen export");
    assert!(reopened.global_attributes().contains_key("history"));
    let var = reopened.variable("temperature").expect("temperature");
    assert_eq!(var.no_data, Some(-999.0));
    assert_eq!(var.units.as_deref(), Some("K"));
}

#[test]
fn test_export_overwrites_existing_file() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("sample.nc");
    let output_path = temp_dir.path().join("slice.nc");
    write_sample(&file_path);
    std::fs::write(&output_path, b"not netcdf").expect("write placeholder");

    let dataset = Dataset::open(&file_path).expect("Failed to open dataset");
    let request = SliceRequest::new("temperature", "lon", "lat").fix_index("time", 0);
    let layer = visualize(&dataset, &request, &VisualizeOptions::default()).expect("visualize");

    write_raster_to_netcdf(&layer.raster, &output_path).expect("export");
    assert!(Dataset::open(&output_path).is_ok());
}

#[test]
fn test_byte_and_int64_fill_values_mask_cells() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("flags.nc");

    {
        let mut file = create(&file_path).expect("Failed to create NetCDF file");
        file.add_dimension("y", 2).expect("Failed to add dimension y");
        file.add_dimension("x", 3).expect("Failed to add dimension x");
        {
            let mut quality = file
                .add_variable::<i8>("quality", &["y", "x"])
                .expect("Failed to add quality");
            quality
                .put_attribute("_FillValue", -127i8)
                .expect("Failed to add byte fill value");
            let data = ndarray::Array2::from_shape_vec((2, 3), vec![0i8, 1, -127, 2, -127, 3])
                .expect("shape");
            quality.put(data.view(), ..).expect("Failed to write quality");
        }
        {
            let mut count = file
                .add_variable::<i64>("count", &["y", "x"])
                .expect("Failed to add count");
            count
                .put_attribute("_FillValue", -1i64)
                .expect("Failed to add int64 fill value");
            count
                .put_attribute("scale_factor", 2i64)
                .expect("Failed to add int64 scale factor");
            let data = ndarray::Array2::from_shape_vec((2, 3), vec![5i64, -1, 7, 8, 9, 10])
                .expect("shape");
            count.put(data.view(), ..).expect("Failed to write count");
        }
    }

    let dataset = Dataset::open(&file_path).expect("Failed to open dataset");

    let quality = dataset.variable("quality").expect("quality");
    assert_eq!(quality.no_data, Some(-127.0));
    let request = SliceRequest::new("quality", "x", "y");
    let layer = visualize(&dataset, &request, &VisualizeOptions::default()).expect("visualize");
    assert!(layer.raster.mask[[0, 2]]);
    assert!(layer.raster.mask[[1, 1]]);
    assert_eq!(layer.raster.valid_count(), 4);

    let count = dataset.variable("count").expect("count");
    assert_eq!(count.no_data, Some(-1.0));
    let request = SliceRequest::new("count", "x", "y");
    let layer = visualize(&dataset, &request, &VisualizeOptions::default()).expect("visualize");
    assert!(layer.raster.mask[[0, 1]]);
    assert_eq!(layer.raster.values[[1, 2]], 20.0);
}

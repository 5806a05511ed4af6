//! Creates a sample NetCDF file for trying out ncslice.
//!
//! The file has a 4-D temperature field with descending latitudes, a packed
//! integer variable with a fill value, and a CF `crs` grid-mapping variable.

use ndarray::{Array1, Array4};
use netcdf::create;
use std::path::Path;

const TIMES: usize = 4;
const LEVELS: usize = 3;
const LATS: usize = 6;
const LONS: usize = 8;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_path = Path::new("sample_data.nc");

    println!("🔨 Creating sample NetCDF file: {}", output_path.display());

    if output_path.exists() {
        std::fs::remove_file(output_path)?
    }

    let mut file = create(output_path)?;

    file.add_attribute("title", "Sample gridded data")?;
    file.add_attribute("Conventions", "CF-1.8")?;
    file.add_attribute("created_by", "create_sample_netcdf.rs")?;

    file.add_dimension("time", TIMES)?;
    file.add_dimension("level", LEVELS)?;
    file.add_dimension("lat", LATS)?;
    file.add_dimension("lon", LONS)?;

    {
        let mut time_var = file.add_variable::<f64>("time", &["time"])?;
        time_var.put_attribute("units", "days since 2024-01-01")?;
        time_var.put_attribute("calendar", "standard")?;
        let time_data = Array1::from_iter((0..TIMES).map(|i| i as f64));
        time_var.put(time_data.view(), ..)?;
    }

    {
        let mut level_var = file.add_variable::<f32>("level", &["level"])?;
        level_var.put_attribute("units", "hPa")?;
        level_var.put_attribute("positive", "down")?;
        let level_data = Array1::from(vec![1000.0f32, 850.0, 500.0]);
        level_var.put(level_data.view(), ..)?;
    }

    {
        // North to south, the usual layout for global grids
        let mut lat_var = file.add_variable::<f32>("lat", &["lat"])?;
        lat_var.put_attribute("units", "degrees_north")?;
        lat_var.put_attribute("axis", "Y")?;
        let lat_data = Array1::from_iter((0..LATS).map(|i| 50.0 - i as f32 * 10.0));
        lat_var.put(lat_data.view(), ..)?;
    }

    {
        let mut lon_var = file.add_variable::<f32>("lon", &["lon"])?;
        lon_var.put_attribute("units", "degrees_east")?;
        lon_var.put_attribute("axis", "X")?;
        let lon_data = Array1::from_iter((0..LONS).map(|i| -180.0 + i as f32 * 45.0));
        lon_var.put(lon_data.view(), ..)?;
    }

    {
        let mut crs_var = file.add_variable::<i32>("crs", &[])?;
        crs_var.put_attribute("grid_mapping_name", "latitude_longitude")?;
        crs_var.put_attribute("semi_major_axis", 6_378_137.0f64)?;
        crs_var.put_attribute("inverse_flattening", 298.257_223_563f64)?;
    }

    {
        let mut temp_var = file.add_variable::<f32>("temperature", &["time", "level", "lat", "lon"])?;
        temp_var.put_attribute("units", "K")?;
        temp_var.put_attribute("long_name", "air temperature")?;
        temp_var.put_attribute("_FillValue", -999.0f32)?;
        temp_var.put_attribute("grid_mapping", "crs")?;

        let temp = Array4::from_shape_fn((TIMES, LEVELS, LATS, LONS), |(t, l, y, x)| {
            if t == 0 && y == 0 && x == 0 {
                return -999.0;
            }
            let lat = 50.0 - y as f32 * 10.0;
            288.0 - 0.5 * lat.abs() - 15.0 * l as f32 + 2.0 * t as f32 + 0.1 * x as f32
        });
        temp_var.put(temp.view(), ..)?;
    }

    {
        let mut precip_var = file.add_variable::<i16>("precipitation", &["time", "lat", "lon"])?;
        precip_var.put_attribute("units", "mm")?;
        precip_var.put_attribute("scale_factor", 0.01f64)?;
        precip_var.put_attribute("add_offset", 0.0f64)?;
        precip_var.put_attribute("_FillValue", -32767i16)?;
        precip_var.put_attribute("grid_mapping", "crs")?;

        let precip = ndarray::Array3::from_shape_fn((TIMES, LATS, LONS), |(t, y, x)| {
            if (t + y + x) % 11 == 0 {
                -32767i16
            } else {
                (t * 100 + y * 10 + x) as i16
            }
        });
        precip_var.put(precip.view(), ..)?;
    }

    println!("✅ Successfully created sample NetCDF file with:");
    println!("   📏 Dimensions: time({}), level({}), lat({}), lon({})", TIMES, LEVELS, LATS, LONS);
    println!("   📈 Variables: temperature, precipitation (packed), crs");
    println!("\n🧪 Try slicing it with:");
    println!("   cargo run -- -f sample_data.nc --variable temperature --fix time=0 --fix level=1");

    Ok(())
}

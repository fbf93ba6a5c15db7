// demos/01-geometric_geodesy.rs
//
// Building a Map, wrapping it in a single-tile Stack, and walking a ray
// down to the ground with a Stepper.
// Run with:
// cargo run --example 01-geometric_geodesy

use std::sync::Arc;

use turtle::ellipsoid::{ecef_from_geodetic, ecef_from_horizontal, ecef_to_geodetic, Geodetic};
use turtle::map::MapSpec;
use turtle::stack::Stack;
use turtle::{Map, Stepper};

fn main() -> Result<(), turtle::Error> {
    let dir = tempfile::tempdir().expect("create scratch directory");

    // A 2x2 degree tile around Copenhagen, flat at 10 m, written as a GRD file.
    let spec = MapSpec { x0: 11.0, x1: 13.0, nx: 3, y0: 54.0, y1: 56.0, ny: 3, z0: 0.0, z1: 20.0 };
    let mut map = Map::create(spec, None)?;
    for iy in 0..3 {
        for ix in 0..3 {
            map.fill(ix, iy, 10.0)?;
        }
    }
    map.dump(&dir.path().join("N54E011.grd"))?;

    // A single-threaded Stack scanning that directory.
    let stack = Stack::create(dir.path(), 4, false)?;
    println!("tile at Copenhagen: {:.1} m", stack.elevation(55.0, 12.0)?);

    // A one-layer Stepper backed by the same tile, descending toward the ground.
    let mut stepper = Stepper::new();
    let layer = stepper.add_layer();
    stepper.add_stack(layer, Arc::new(stack), 0.0)?;

    let lat = 55.0;
    let lon = 12.0;
    let mut position = ecef_from_geodetic(Geodetic { lat, lon, h: 50.0 });
    let direction = ecef_from_horizontal(lat, lon, 0.0, -60.0);

    for _ in 0..50 {
        let out = stepper.step(position, Some(direction))?;
        println!(
            "lat={:.6} lon={:.6} altitude={:.3} step={:.4}",
            out.latitude, out.longitude, out.altitude, out.step
        );
        position = ecef_from_geodetic(Geodetic { lat: out.latitude, lon: out.longitude, h: out.altitude });
        let geodetic = ecef_to_geodetic(position);
        if geodetic.h < 0.0 {
            println!("crossed the ground");
            break;
        }
    }

    Ok(())
}

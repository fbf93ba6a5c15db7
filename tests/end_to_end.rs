//! Cross-module pipeline: a Map dumped to disk, picked up by a Stack, shared
//! by two concurrent Clients, and walked by a Stepper all the way to the
//! ground. Every module has its own unit tests for its own contract; this
//! file is the one place that exercises the full handle chain the way a
//! caller actually would.

use std::sync::Arc;

use turtle::ellipsoid::{ecef_from_geodetic, ecef_from_horizontal, ecef_to_geodetic, Geodetic};
use turtle::map::MapSpec;
use turtle::{Client, Map, Stack, Stepper};

fn flat_tile(dir: &std::path::Path, lat: i32, lon: i32, z: f64) {
    let name = format!("N{lat:02}E{lon:03}.grd");
    let spec = MapSpec { x0: lon as f64, x1: lon as f64 + 1.0, nx: 2, y0: lat as f64, y1: lat as f64 + 1.0, ny: 2, z0: 0.0, z1: 1000.0 };
    let mut map = Map::create(spec, None).unwrap();
    for iy in 0..2 {
        for ix in 0..2 {
            map.fill(ix, iy, z).unwrap();
        }
    }
    map.dump(&dir.join(name)).unwrap();
}

#[test]
fn map_through_stack_and_client_to_stepper() {
    let dir = tempfile::tempdir().unwrap();
    flat_tile(dir.path(), 45, 3, 120.0);
    flat_tile(dir.path(), 46, 3, 80.0);

    let stack = Arc::new(Stack::create(dir.path(), 4, true).unwrap());

    // Two independent clients against the same shareable stack agree on the
    // ground elevation, each via its own pinned tile.
    let mut c1 = Client::create(&stack).unwrap();
    let mut c2 = Client::create(&stack).unwrap();
    assert_eq!(c1.elevation(45.5, 3.5).unwrap(), 120.0);
    assert_eq!(c2.elevation(46.5, 3.5).unwrap(), 80.0);
    assert!(c1.is_pinned() && c2.is_pinned());

    // The same stack, fed into a Stepper as a layer, reports the same ground
    // through the Stepper's own sample-mode query.
    let mut stepper = Stepper::new();
    let layer = stepper.add_layer();
    stepper.add_stack(layer, Arc::clone(&stack), 0.0).unwrap();

    let start = ecef_from_geodetic(Geodetic { lat: 45.5, lon: 3.5, h: 200.0 });
    let sample = stepper.step(start, None).unwrap();
    assert!(sample.step > 0.0);
    let ground = match sample.elevation {
        turtle::Elevation::Single(z) => z,
        turtle::Elevation::Pair(_, _) => panic!("single-layer stepper should report a scalar"),
    };
    assert!((ground - 120.0).abs() < 1.0);

    // Walking straight down converges on the tile's ground.
    let mut position = start;
    let direction = ecef_from_horizontal(45.5, 3.5, 0.0, -90.0);
    let mut crossed = false;
    for _ in 0..200 {
        let out = stepper.step(position, Some(direction)).unwrap();
        position = ecef_from_geodetic(Geodetic { lat: out.latitude, lon: out.longitude, h: out.altitude });
        let ground = match out.elevation {
            turtle::Elevation::Single(z) => z,
            turtle::Elevation::Pair(_, _) => panic!("single-layer stepper should report a scalar"),
        };
        if out.altitude < ground {
            crossed = true;
            break;
        }
    }
    assert!(crossed, "ray never crossed the ground within the iteration budget");

    let geodetic = ecef_to_geodetic(position);
    assert!((geodetic.h - 120.0).abs() < 1.0, "landed at {:.3} m, expected close to 120 m", geodetic.h);
}

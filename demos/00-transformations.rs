// demos/00-transformations.rs
//
// ECEF/geodetic round-tripping and map projections.
// Run with:
// cargo run --example 00-transformations

use turtle::{ecef_from_geodetic, ecef_to_geodetic, projection, Geodetic};

fn main() {
    // Copenhagen, Oslo, Stockholm, Helsinki, as geodetic (lat, lon, h).
    let cph = Geodetic { lat: 55.0, lon: 12.0, h: 0.0 };
    let osl = Geodetic { lat: 60.0, lon: 10.0, h: 0.0 };
    let sth = Geodetic { lat: 59.0, lon: 18.0, h: 0.0 };
    let hel = Geodetic { lat: 60.0, lon: 25.0, h: 0.0 };

    println!("ECEF:");
    for city in [cph, osl, sth, hel] {
        let ecef = ecef_from_geodetic(city);
        println!("    {:?} -> {:?}", city, ecef);
    }

    // Round-trip through ECEF should return the same geodetic point.
    let back = ecef_to_geodetic(ecef_from_geodetic(cph));
    assert!((back.lat - cph.lat).abs() < 1e-9);
    assert!((back.lon - cph.lon).abs() < 1e-9);

    // Project Copenhagen into UTM zone 32.
    let utm32 = match projection::configure("UTM 32N") {
        Err(e) => return println!("Bad projection: {e}"),
        Ok(p) => p,
    };
    let (easting, northing) = utm32.project(cph.lat, cph.lon);
    println!("Copenhagen in UTM 32N: ({easting:.1}, {northing:.1})");

    let (lat, lon) = utm32.unproject(easting, northing);
    println!("Roundtrip back to geographic: ({lat:.6}, {lon:.6})");

    // An unrecognised projection string is a configuration error, not a panic.
    println!("Bad syntax example:");
    match projection::configure("Mercator") {
        Err(e) => println!("    Deliberate error: {e}"),
        Ok(_) => unreachable!(),
    };
}

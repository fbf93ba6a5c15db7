//! WGS84 ECEF/geodetic math (component A).
//!
//! All operations here are pure functions of their arguments: no tile, no
//! stack, no projection state. `turtle` only ever operates on WGS84
//! (explicit non-goal: no other ellipsoid), so the constants below are
//! not parameterised the way a general geodesy crate would.

/// WGS84 semi-major axis, metres.
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 first eccentricity.
pub const WGS84_E: f64 = 0.081_819_190_842_622;

#[inline]
fn e2() -> f64 {
    WGS84_E * WGS84_E
}

/// A geodetic coordinate: latitude and longitude in degrees, height in metres
/// above the WGS84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geodetic {
    pub lat: f64,
    pub lon: f64,
    pub h: f64,
}

/// An Earth-Centered Earth-Fixed cartesian coordinate, metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ecef {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Ecef {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Ecef { x, y, z }
    }

    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y).hypot(self.z)
    }
}

/// A direction expressed as an ECEF unit vector.
pub type Direction = Ecef;

/// Convert geodetic (lat°, lon°, h) to ECEF (x, y, z), standard ellipsoidal formula.
pub fn ecef_from_geodetic(g: Geodetic) -> Ecef {
    let lat = g.lat.to_radians();
    let lon = g.lon.to_radians();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();

    let n = WGS84_A / (1.0 - e2() * sin_lat * sin_lat).sqrt();

    let x = (n + g.h) * cos_lat * cos_lon;
    let y = (n + g.h) * cos_lat * sin_lon;
    let z = (n * (1.0 - e2()) + g.h) * sin_lat;

    Ecef::new(x, y, z)
}

/// Convert ECEF (x, y, z) to geodetic (lat°, lon°, h), using Olson's (1996)
/// direct (non-iterative) algorithm.
///
/// The polar axis (`x = 0 ∧ y = 0`) is special-cased: `lat = ±90°`,
/// `lon = 0°`, `h = |z| - a·sqrt(1 - e²)`.
pub fn ecef_to_geodetic(e: Ecef) -> Geodetic {
    if e.x == 0.0 && e.y == 0.0 {
        let lat = if e.z >= 0.0 { 90.0 } else { -90.0 };
        let h = e.z.abs() - WGS84_A * (1.0 - e2()).sqrt();
        return Geodetic { lat, lon: 0.0, h };
    }

    // Olson, D.K. (1996), "Converting Earth-Centered, Earth-Fixed Coordinates
    // to Geodetic Coordinates", IEEE Transactions on Aerospace and Electronic
    // Systems, 32(1):473-476.
    let a = WGS84_A;
    let e2_ = e2();
    let a1 = a * e2_;
    let a2 = a1 * a1;
    let a3 = a1 * e2_ / 2.0;
    let a4 = 2.5 * a2;
    let a5 = a1 + a3;
    let a6 = 1.0 - e2_;

    let zp = e.z.abs();
    let w2 = e.x * e.x + e.y * e.y;
    let w = w2.sqrt();
    let z2 = e.z * e.z;
    let r2 = w2 + z2;
    let r = r2.sqrt();

    let lon = e.y.atan2(e.x);

    let s2 = z2 / r2;
    let c2 = w2 / r2;
    let u = a2 / r;
    let v = a3 - a4 / r;

    let (s, c, ss);
    if c2 > 0.3 {
        s = (zp / r) * (1.0 + c2 * (a1 + u + s2 * v) / r);
        ss = s * s;
        c = (1.0 - ss).sqrt();
    } else {
        c = (w / r) * (1.0 - s2 * (a5 - u - c2 * v) / r);
        ss = 1.0 - c * c;
        s = ss.sqrt();
    }

    let g = 1.0 - e2_ * ss;
    let rg = a / g.sqrt();
    let rf = a6 * rg;
    let u = w - rg * c;
    let v = zp - rf * s;
    let f = c * u + s * v;
    let m = c * v - s * u;
    let p = m / (rf / g + f);
    let lat_corr = s.atan2(c) + p;
    let lat_deg = if e.z < 0.0 { -lat_corr } else { lat_corr }.to_degrees();
    let h = f + m * p / 2.0;

    Geodetic {
        lat: lat_deg,
        lon: lon.to_degrees(),
        h,
    }
}

/// Local East-North-Up basis vectors at a geodetic point, expressed as ECEF unit vectors.
pub fn enu_basis(lat: f64, lon: f64) -> (Ecef, Ecef, Ecef) {
    let lat = lat.to_radians();
    let lon = lon.to_radians();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();

    let east = Ecef::new(-sin_lon, cos_lon, 0.0);
    let north = Ecef::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat);
    let up = Ecef::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat);
    (east, north, up)
}

/// Convert a horizontal direction (azimuth° measured from North toward East,
/// elevation° above the local horizon) at a geodetic point to an ECEF unit vector.
pub fn ecef_from_horizontal(lat: f64, lon: f64, az: f64, el: f64) -> Direction {
    let (east, north, up) = enu_basis(lat, lon);
    let az = az.to_radians();
    let el = el.to_radians();
    let (sin_az, cos_az) = az.sin_cos();
    let (sin_el, cos_el) = el.sin_cos();

    Ecef::new(
        cos_el * sin_az * east.x + cos_el * cos_az * north.x + sin_el * up.x,
        cos_el * sin_az * east.y + cos_el * cos_az * north.y + sin_el * up.y,
        cos_el * sin_az * east.z + cos_el * cos_az * north.z + sin_el * up.z,
    )
}

/// Single-precision epsilon, used as the degeneracy threshold for
/// `ecef_to_horizontal` per spec §4.A.
const FLT_EPSILON: f64 = f32::EPSILON as f64;

/// Inverse of [`ecef_from_horizontal`]: recover (azimuth°, elevation°) of a
/// direction vector at a geodetic point. Leaves outputs untouched (returns
/// `None`) if the input vector's norm is at or below single-precision epsilon.
pub fn ecef_to_horizontal(lat: f64, lon: f64, dir: Direction) -> Option<(f64, f64)> {
    let norm = dir.norm();
    if norm <= FLT_EPSILON {
        return None;
    }
    let (east, north, up) = enu_basis(lat, lon);
    let e = (dir.x * east.x + dir.y * east.y + dir.z * east.z) / norm;
    let n = (dir.x * north.x + dir.y * north.y + dir.z * north.z) / norm;
    let u = (dir.x * up.x + dir.y * up.y + dir.z * up.z) / norm;

    let az = e.atan2(n).to_degrees();
    let az = if az < 0.0 { az + 360.0 } else { az };
    let el = u.clamp(-1.0, 1.0).asin().to_degrees();
    Some((az, el))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geodetic_ecef_roundtrip() {
        let samples = [
            (0.0, 0.0, 0.0),
            (55.0, 12.0, 100.0),
            (-33.9, 18.4, 1500.0),
            (89.999, 45.0, 10.0),
            (-89.999, -120.0, -5.0),
            (0.0, 179.999, 8848.0),
        ];
        for (lat, lon, h) in samples {
            let g = Geodetic { lat, lon, h };
            let e = ecef_from_geodetic(g);
            let back = ecef_to_geodetic(e);
            assert!((back.lat - lat).abs() < 1e-8, "lat {} vs {}", back.lat, lat);
            assert!((back.lon - lon).abs() < 1e-8, "lon {} vs {}", back.lon, lon);
            assert!((back.h - h).abs() < 1e-6, "h {} vs {}", back.h, h);
        }
    }

    #[test]
    fn polar_axis_special_case() {
        let north = ecef_to_geodetic(Ecef::new(0.0, 0.0, 6_356_752.314_245));
        assert!((north.lat - 90.0).abs() < 1e-6);
        assert_eq!(north.lon, 0.0);

        let south = ecef_to_geodetic(Ecef::new(0.0, 0.0, -6_356_752.314_245));
        assert!((south.lat + 90.0).abs() < 1e-6);
    }

    #[test]
    fn horizontal_roundtrip() {
        let lat = 48.5;
        let lon = 2.3;
        for (az, el) in [(0.0, 0.0), (90.0, 45.0), (270.0, -10.0), (123.4, 89.0)] {
            let dir = ecef_from_horizontal(lat, lon, az, el);
            let (az2, el2) = ecef_to_horizontal(lat, lon, dir).unwrap();
            assert!((az - az2).abs() < 1e-6 || (az - az2).abs() > 359.999999);
            assert!((el - el2).abs() < 1e-6);
        }
    }

    #[test]
    fn horizontal_degenerate_vector() {
        assert!(ecef_to_horizontal(0.0, 0.0, Ecef::new(0.0, 0.0, 0.0)).is_none());
    }
}

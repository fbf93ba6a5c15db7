//! Lambert conformal conic projections (IGN NTG_71 parameter table), one
//! tangent standard parallel per zone.

use crate::ellipsoid::{WGS84_A, WGS84_E};

/// One of the six IGN Lambert zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LambertVariant {
    I,
    II,
    IIe,
    III,
    IV,
    NinetyThree,
}

impl LambertVariant {
    pub fn tag(self) -> &'static str {
        match self {
            LambertVariant::I => "I",
            LambertVariant::II => "II",
            LambertVariant::IIe => "IIe",
            LambertVariant::III => "III",
            LambertVariant::IV => "IV",
            LambertVariant::NinetyThree => "93",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "I" => LambertVariant::I,
            "II" => LambertVariant::II,
            "IIe" => LambertVariant::IIe,
            "III" => LambertVariant::III,
            "IV" => LambertVariant::IV,
            "93" => LambertVariant::NinetyThree,
            _ => return None,
        })
    }

    fn params(self) -> LambertParams {
        // IGN NTG_71, one tangent standard parallel per zone. Longitudes
        // are given relative to Greenwich; I-IV and IIe are historically
        // referenced to the Paris meridian (2.337229167 deg E of Greenwich).
        const PARIS: f64 = 2.337_229_167;
        match self {
            LambertVariant::I => LambertParams {
                n: 0.760_405_965_6,
                c: 11_603_796.9767,
                xs: 600_000.0,
                ys: 5_657_616.674,
                lon0: PARIS,
            },
            LambertVariant::II => LambertParams {
                n: 0.728_968_627_4,
                c: 11_745_793.3960,
                xs: 600_000.0,
                ys: 6_199_695.768,
                lon0: PARIS,
            },
            LambertVariant::IIe => LambertParams {
                n: 0.728_968_627_4,
                c: 11_745_793.3960,
                xs: 600_000.0,
                ys: 8_199_695.768,
                lon0: PARIS,
            },
            LambertVariant::III => LambertParams {
                n: 0.695_912_796_6,
                c: 11_947_992.5361,
                xs: 600_000.0,
                ys: 6_791_905.085,
                lon0: PARIS,
            },
            LambertVariant::IV => LambertParams {
                n: 0.671_267_932_2,
                c: 12_136_281.9909,
                xs: 234.358,
                ys: 7_239_161.542,
                lon0: PARIS,
            },
            LambertVariant::NinetyThree => LambertParams {
                n: 0.725_607_765_0,
                c: 11_754_255.4260,
                xs: 700_000.0,
                ys: 6_600_000.0,
                lon0: 3.0,
            },
        }
    }
}

struct LambertParams {
    n: f64,
    c: f64,
    xs: f64,
    ys: f64,
    lon0: f64,
}

fn isometric_latitude(lat: f64, e: f64) -> f64 {
    (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln() - e * (e * lat.sin()).atanh()
}

/// Single-precision epsilon, the iteration tolerance mandated by spec §4.B.
const FLT_EPSILON: f64 = f32::EPSILON as f64;

fn isometric_to_geographic(l: f64, e: f64) -> f64 {
    let mut lat = 2.0 * l.exp().atan() - std::f64::consts::FRAC_PI_2;
    loop {
        let next = 2.0
            * (l + e * (e * lat.sin()).atanh())
                .exp()
                .atan()
            - std::f64::consts::FRAC_PI_2;
        if (next - lat).abs() <= FLT_EPSILON {
            lat = next;
            break;
        }
        lat = next;
    }
    lat
}

/// Project geodetic (lat°, lon°) to Lambert (x, y) metres.
pub fn project(variant: LambertVariant, lat: f64, lon: f64) -> (f64, f64) {
    let p = variant.params();
    let e = WGS84_E;
    let lat_r = lat.to_radians();
    let lon_r = lon.to_radians();
    let lon0_r = p.lon0.to_radians();

    let l = isometric_latitude(lat_r, e);
    let r = p.c * (-p.n * l).exp();
    let theta = p.n * (lon_r - lon0_r);

    let x = p.xs + r * theta.sin();
    let y = p.ys - r * theta.cos();
    (x, y)
}

/// Unproject Lambert (x, y) metres to geodetic (lat°, lon°). The
/// isometric-latitude fixed point iterates until convergence within
/// single-precision epsilon (spec §4.B).
pub fn unproject(variant: LambertVariant, x: f64, y: f64) -> (f64, f64) {
    let p = variant.params();
    let e = WGS84_E;
    let lon0_r = p.lon0.to_radians();

    let dx = x - p.xs;
    let dy = p.ys - y;
    let r = p.n.signum() * dx.hypot(dy);
    let theta = dx.atan2(dy);

    // r = c * exp(-n*l)  =>  l = (ln c - ln r) / n
    let l = (p.c.ln() - r.ln()) / p.n;

    let lat = isometric_to_geographic(l, e);
    let lon = lon0_r + theta / p.n;

    (lat.to_degrees(), lon.to_degrees())
}

//! Map projections (component B): Lambert conformal conic and UTM, plus the
//! textual configuration syntax used by [`Map`](crate::map::Map) metadata.

mod lambert;
mod utm;

pub use lambert::LambertVariant;

use crate::error::{raise, ErrorKind, Result};

/// The projection a tile or stack's coordinates are expressed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Geographic (lat, lon) degrees: no projection.
    None,
    Lambert(LambertVariant),
    Utm { longitude_0: f64, hemisphere: i8 },
}

impl Projection {
    /// Forward-project geodetic (lat°, lon°) to the projection's plane. A no-op for `None`.
    pub fn project(&self, lat: f64, lon: f64) -> (f64, f64) {
        match self {
            Projection::None => (lat, lon),
            Projection::Lambert(v) => lambert::project(*v, lat, lon),
            Projection::Utm { longitude_0, hemisphere } => {
                utm::project(lat, lon, *longitude_0, *hemisphere)
            }
        }
    }

    /// Inverse-project plane (x, y) back to geodetic (lat°, lon°).
    pub fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Projection::None => (x, y),
            Projection::Lambert(v) => lambert::unproject(*v, x, y),
            Projection::Utm { longitude_0, hemisphere } => {
                utm::unproject(x, y, *longitude_0, *hemisphere)
            }
        }
    }
}

/// Parse a projection name per the textual syntax:
///
/// - `"Lambert I"`, `"Lambert II"`, `"Lambert IIe"`, `"Lambert III"`,
///   `"Lambert IV"`, `"Lambert 93"`
/// - `"UTM <N>[NS]"` — zone number `N` (1..=60), central longitude `6*N-183`
/// - `"UTM <longitude>[NS]"` — an explicit central longitude (must contain a
///   decimal point so it is distinguishable from a zone number)
///
/// The hemisphere suffix defaults to `N` when omitted.
pub fn configure(name: &str) -> Result<Projection> {
    let name = name.trim();
    if let Some(rest) = name.strip_prefix("Lambert ") {
        return LambertVariant::from_tag(rest.trim())
            .map(Projection::Lambert)
            .ok_or_else(|| raise!("projection::configure", ErrorKind::BadProjection, "unknown Lambert variant {rest:?}"));
    }

    if let Some(rest) = name.strip_prefix("UTM ") {
        let rest = rest.trim();
        let (token, hemisphere) = match rest.chars().last() {
            Some('N') | Some('n') => (&rest[..rest.len() - 1], 1i8),
            Some('S') | Some('s') => (&rest[..rest.len() - 1], -1i8),
            _ => (rest, 1i8),
        };
        let token = token.trim();

        if token.contains('.') {
            let longitude_0: f64 = token
                .parse()
                .map_err(|_| raise!("projection::configure", ErrorKind::BadProjection, "bad UTM longitude {token:?}"))?;
            return Ok(Projection::Utm { longitude_0, hemisphere });
        }

        let zone: u32 = token
            .parse()
            .map_err(|_| raise!("projection::configure", ErrorKind::BadProjection, "bad UTM zone {token:?}"))?;
        if !(1..=60).contains(&zone) {
            return Err(raise!("projection::configure", ErrorKind::BadProjection, "UTM zone {zone} out of range"));
        }
        return Ok(Projection::Utm {
            longitude_0: utm::zone_to_central_longitude(zone),
            hemisphere,
        });
    }

    Err(raise!("projection::configure", ErrorKind::BadProjection, "unrecognised projection {name:?}"))
}

/// Render a [`Projection`] back to its textual name, inverse of [`configure`].
///
/// A UTM projection re-renders as `"UTM <N>N/S"` when its central longitude
/// matches a standard zone within floating point epsilon, else as
/// `"UTM <longitude>N/S"`.
pub fn name(p: &Projection) -> String {
    match p {
        Projection::None => "None".to_string(),
        Projection::Lambert(v) => format!("Lambert {}", v.tag()),
        Projection::Utm { longitude_0, hemisphere } => {
            let suffix = if *hemisphere < 0 { "S" } else { "N" };
            match utm::central_longitude_to_zone(*longitude_0) {
                Some(zone) => format!("UTM {zone}{suffix}"),
                None => format!("UTM {longitude_0}{suffix}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lambert_roundtrip_names() {
        for tag in ["I", "II", "IIe", "III", "IV", "93"] {
            let input = format!("Lambert {tag}");
            let p = configure(&input).unwrap();
            assert_eq!(name(&p), input);
        }
    }

    #[test]
    fn utm_zone_roundtrip_name() {
        let p = configure("UTM 31N").unwrap();
        assert_eq!(name(&p), "UTM 31N");

        let p = configure("UTM 33S").unwrap();
        assert_eq!(name(&p), "UTM 33S");

        // Bare zone with no hemisphere suffix defaults to north.
        let p = configure("UTM 31").unwrap();
        assert_eq!(name(&p), "UTM 31N");
    }

    #[test]
    fn utm_explicit_longitude() {
        let p = configure("UTM 3.0N").unwrap();
        match p {
            Projection::Utm { longitude_0, hemisphere } => {
                assert!((longitude_0 - 3.0).abs() < 1e-12);
                assert_eq!(hemisphere, 1);
            }
            _ => panic!("expected UTM"),
        }
        // 3.0 happens to equal zone 31's central longitude, so it renders as a zone.
        assert_eq!(name(&p), "UTM 31N");
    }

    #[test]
    fn utm_explicit_longitude_off_zone() {
        let p = configure("UTM 3.45N").unwrap();
        assert_eq!(name(&p), "UTM 3.45N");
    }

    #[test]
    fn bad_projection_strings() {
        assert!(configure("Lambert V").is_err());
        assert!(configure("UTM 0N").is_err());
        assert!(configure("UTM 61N").is_err());
        assert!(configure("Mercator").is_err());
    }
}

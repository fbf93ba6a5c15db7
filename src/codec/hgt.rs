//! SRTM HGT codec, read only — the format has no standard writer (spec §6).

use std::fs;
use std::path::Path;

use crate::error::{raise, ErrorKind, Result};
use crate::map::{Map, MapInfo};
use crate::projection::Projection;
use crate::quantize;

use super::Codec;

pub(crate) struct HgtCodec;

/// Parse an SW-corner cell name like `N45E003` or `S01W122` into (lat, lon) degrees.
fn parse_sw_corner(stem: &str) -> Option<(f64, f64)> {
    let bytes = stem.as_bytes();
    let lat_sign = match bytes.first()? {
        b'N' | b'n' => 1.0,
        b'S' | b's' => -1.0,
        _ => return None,
    };
    let lat: f64 = stem.get(1..3)?.parse().ok()?;

    let lon_sign = match stem.as_bytes().get(3)? {
        b'E' | b'e' => 1.0,
        b'W' | b'w' => -1.0,
        _ => return None,
    };
    let lon: f64 = stem.get(4..7)?.parse().ok()?;

    Some((lat_sign * lat, lon_sign * lon))
}

impl Codec for HgtCodec {
    fn extensions(&self) -> &'static [&'static str] {
        &["hgt"]
    }

    fn load(&self, path: &Path) -> Result<Map> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| raise!("HgtCodec::load", ErrorKind::BadFormat, "{path:?}: no filename"))?;
        let (lat0, lon0) = parse_sw_corner(stem)
            .ok_or_else(|| raise!("HgtCodec::load", ErrorKind::BadFormat, "{path:?}: unparsable SW corner"))?;

        let n = if stem.contains("SRTMGL1") { 3601usize } else { 1201usize };

        let bytes = fs::read(path).map_err(|e| raise!("HgtCodec::load", ErrorKind::BadFormat, "{path:?}: {e}"))?;
        if bytes.len() != n * n * 2 {
            return Err(raise!(
                "HgtCodec::load",
                ErrorKind::BadFormat,
                "{path:?}: expected {} bytes for a {n}x{n} tile, got {}",
                n * n * 2,
                bytes.len()
            ));
        }

        // Stored top-to-bottom, big-endian signed 16-bit; row 0 is the northernmost row.
        let mut raw = vec![0i16; n * n];
        for row in 0..n {
            let j = n - 1 - row;
            for i in 0..n {
                let idx = row * n + i;
                raw[j * n + i] = i16::from_be_bytes([bytes[2 * idx], bytes[2 * idx + 1]]);
            }
        }

        let z0 = *raw.iter().min().unwrap() as f64;
        let z1_raw = *raw.iter().max().unwrap() as f64;
        let z1 = if z1_raw == z0 { z0 + 1.0 } else { z1_raw };
        let dz = quantize::step(z0, z1);

        let data: Vec<u16> = raw.into_iter().map(|v| quantize::encode(v as f64, z0, dz)).collect();

        let dx = 1.0 / (n - 1) as f64;
        let info = MapInfo { x0: lon0, dx, nx: n, y0: lat0, dy: dx, ny: n, z0, z1 };
        Ok(Map::from_raw(info, dz, Projection::None, data))
    }

    fn dump(&self, _path: &Path, _map: &Map) -> Result<()> {
        Err(raise!("HgtCodec::dump", ErrorKind::BadFormat, "HGT has no standard writer"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_corners() {
        assert_eq!(parse_sw_corner("N45E003"), Some((45.0, 3.0)));
        assert_eq!(parse_sw_corner("S01W122"), Some((-1.0, -122.0)));
        assert_eq!(parse_sw_corner("garbage"), None);
    }

    #[test]
    fn resolution_from_name() {
        assert!("N45E003_SRTMGL1".contains("SRTMGL1"));
    }
}

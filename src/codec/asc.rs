//! Esri ASCII grid codec, read and write (spec §6).

use std::fs;
use std::path::Path;

use crate::error::{raise, ErrorKind, Result};
use crate::map::{Map, MapInfo};
use crate::projection::Projection;
use crate::quantize;

use super::Codec;

pub(crate) struct AscCodec;

impl Codec for AscCodec {
    fn extensions(&self) -> &'static [&'static str] {
        &["asc"]
    }

    fn load(&self, path: &Path) -> Result<Map> {
        let text = fs::read_to_string(path).map_err(|e| raise!("AscCodec::load", ErrorKind::BadFormat, "{path:?}: {e}"))?;
        let mut lines = text.lines();

        let mut header = |expect: &'static str| -> Result<f64> {
            let line = lines
                .next()
                .ok_or_else(|| raise!("AscCodec::load", ErrorKind::BadFormat, "{path:?}: missing {expect} header"))?;
            let mut it = line.split_whitespace();
            let key = it.next().unwrap_or_default();
            if !key.eq_ignore_ascii_case(expect) {
                return Err(raise!("AscCodec::load", ErrorKind::BadFormat, "{path:?}: expected {expect}, got {key}"));
            }
            it.next()
                .ok_or_else(|| raise!("AscCodec::load", ErrorKind::BadFormat, "{path:?}: {expect} missing value"))?
                .parse()
                .map_err(|_| raise!("AscCodec::load", ErrorKind::BadFormat, "{path:?}: bad {expect}"))
        };

        let nx = header("ncols")? as usize;
        let ny = header("nrows")? as usize;
        let xllcorner = header("xllcorner")?;
        let yllcorner = header("yllcorner")?;
        let cellsize = header("cellsize")?;
        let nodata = header("NODATA_value")?;

        let mut values = Vec::with_capacity(nx * ny);
        for tok in lines.flat_map(|l| l.split_whitespace()) {
            let v: f64 = tok
                .parse()
                .map_err(|_| raise!("AscCodec::load", ErrorKind::BadFormat, "{path:?}: bad value {tok:?}"))?;
            values.push(v);
        }
        if values.len() != nx * ny {
            return Err(raise!(
                "AscCodec::load",
                ErrorKind::BadFormat,
                "{path:?}: expected {} values, got {}",
                nx * ny,
                values.len()
            ));
        }

        let (mut z0, mut z1) = (f64::INFINITY, f64::NEG_INFINITY);
        for &v in &values {
            if v == nodata {
                continue;
            }
            z0 = z0.min(v);
            z1 = z1.max(v);
        }
        if !z0.is_finite() {
            z0 = 0.0;
            z1 = 1.0;
        }
        if z1 == z0 {
            z1 = z0 + 1.0;
        }
        let dz = quantize::step(z0, z1);

        // ASC rows are stored top-to-bottom (row 0 is the northernmost row).
        let mut data = vec![0u16; nx * ny];
        for row in 0..ny {
            let j = ny - 1 - row;
            for i in 0..nx {
                let v = values[row * nx + i];
                data[j * nx + i] = if v == nodata { 0 } else { quantize::encode(v, z0, dz) };
            }
        }

        let info = MapInfo { x0: xllcorner, dx: cellsize, nx, y0: yllcorner, dy: cellsize, ny, z0, z1 };
        Ok(Map::from_raw(info, dz, Projection::None, data))
    }

    fn dump(&self, path: &Path, map: &Map) -> Result<()> {
        let info = map.info();
        if (info.dx - info.dy).abs() > 1e-9 {
            return Err(raise!("AscCodec::dump", ErrorKind::BadFormat, "ASC requires square cells (dx == dy)"));
        }
        const NODATA: f64 = -9999.0;

        let mut out = String::new();
        out.push_str(&format!("ncols {}\n", info.nx));
        out.push_str(&format!("nrows {}\n", info.ny));
        out.push_str(&format!("xllcorner {}\n", info.x0));
        out.push_str(&format!("yllcorner {}\n", info.y0));
        out.push_str(&format!("cellsize {}\n", info.dx));
        out.push_str(&format!("NODATA_value {NODATA}\n"));

        for row in 0..info.ny {
            let j = info.ny - 1 - row;
            for i in 0..info.nx {
                let (_, _, z) = map.node(i, j)?;
                out.push_str(&format!("{z} "));
            }
            out.push('\n');
        }
        fs::write(path, out).map_err(|e| raise!("AscCodec::dump", ErrorKind::BadFormat, "{path:?}: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MapSpec;

    #[test]
    fn roundtrip() {
        let spec = MapSpec { x0: 10.0, x1: 12.0, nx: 3, y0: 20.0, y1: 22.0, ny: 3, z0: 0.0, z1: 1000.0 };
        let mut map = Map::create(spec, None).unwrap();
        for j in 0..3 {
            for i in 0..3 {
                map.fill(i, j, (i + j) as f64 * 100.0).unwrap();
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.asc");
        map.dump(&path).unwrap();
        let back = Map::load(&path).unwrap();

        assert_eq!(back.info().nx, 3);
        for j in 0..3 {
            for i in 0..3 {
                let (_, _, a) = map.node(i, j).unwrap();
                let (_, _, b) = back.node(i, j).unwrap();
                assert!((a - b).abs() < 1.0);
            }
        }
    }
}

//! GRD (EGM96-style text grid) codec, read and write (spec §6).

use std::fs;
use std::path::Path;

use crate::error::{raise, ErrorKind, Result};
use crate::map::{Map, MapInfo};
use crate::projection::Projection;
use crate::quantize;

use super::Codec;

pub(crate) struct GrdCodec;

impl Codec for GrdCodec {
    fn extensions(&self) -> &'static [&'static str] {
        &["grd"]
    }

    fn load(&self, path: &Path) -> Result<Map> {
        let text = fs::read_to_string(path).map_err(|e| raise!("GrdCodec::load", ErrorKind::BadFormat, "{path:?}: {e}"))?;
        let mut tokens = text.split_whitespace();

        let mut next_f64 = |what: &'static str| -> Result<f64> {
            tokens
                .next()
                .ok_or_else(|| raise!("GrdCodec::load", ErrorKind::BadFormat, "{path:?}: missing {what}"))?
                .parse()
                .map_err(|_| raise!("GrdCodec::load", ErrorKind::BadFormat, "{path:?}: bad {what}"))
        };

        let y_min = next_f64("y_min")?;
        let y_max = next_f64("y_max")?;
        let x_min = next_f64("x_min")?;
        let x_max = next_f64("x_max")?;
        let dy = next_f64("dy")?;
        let dx = next_f64("dx")?;

        let nx = ((x_max - x_min) / dx).round() as usize + 1;
        let ny = ((y_max - y_min) / dy).round() as usize + 1;

        let mut values = Vec::with_capacity(nx * ny);
        for tok in tokens {
            let v: f64 = tok
                .parse()
                .map_err(|_| raise!("GrdCodec::load", ErrorKind::BadFormat, "{path:?}: bad value {tok:?}"))?;
            values.push(v);
        }
        if values.len() != nx * ny {
            return Err(raise!(
                "GrdCodec::load",
                ErrorKind::BadFormat,
                "{path:?}: expected {} values, got {}",
                nx * ny,
                values.len()
            ));
        }

        let z0 = values.iter().copied().fold(f64::INFINITY, f64::min);
        let z1 = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let z1 = if z1 == z0 { z0 + 1.0 } else { z1 };
        let dz = quantize::step(z0, z1);

        let mut data = vec![0u16; nx * ny];
        for (k, v) in values.into_iter().enumerate() {
            data[k] = quantize::encode(v, z0, dz);
        }

        let info = MapInfo { x0: x_min, dx, nx, y0: y_min, dy, ny, z0, z1 };
        Ok(Map::from_raw(info, dz, Projection::None, data))
    }

    fn dump(&self, path: &Path, map: &Map) -> Result<()> {
        let info = map.info();
        let mut out = String::new();
        out.push_str(&format!(
            "{} {} {} {} {} {}\n",
            info.y0,
            info.y1(),
            info.x0,
            info.x1(),
            info.dy,
            info.dx
        ));
        for j in 0..info.ny {
            for i in 0..info.nx {
                let (_, _, z) = map.node(i, j)?;
                out.push_str(&format!("{z} "));
            }
            out.push('\n');
        }
        fs::write(path, out).map_err(|e| raise!("GrdCodec::dump", ErrorKind::BadFormat, "{path:?}: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MapSpec;

    #[test]
    fn roundtrip() {
        let spec = MapSpec { x0: 0.0, x1: 2.0, nx: 3, y0: 0.0, y1: 2.0, ny: 3, z0: 0.0, z1: 1000.0 };
        let mut map = Map::create(spec, None).unwrap();
        for j in 0..3 {
            for i in 0..3 {
                map.fill(i, j, (i * 3 + j) as f64 * 10.0).unwrap();
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("egm.grd");
        map.dump(&path).unwrap();
        let back = Map::load(&path).unwrap();

        for j in 0..3 {
            for i in 0..3 {
                let (_, _, a) = map.node(i, j).unwrap();
                let (_, _, b) = back.node(i, j).unwrap();
                assert!((a - b).abs() < 1.0, "({i},{j}): {a} vs {b}");
            }
        }
    }
}

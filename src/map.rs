//! In-memory regular-grid elevation data (component D).

use crate::codec;
use crate::error::{raise, ErrorKind, Result};
use crate::projection::{self, Projection};
use crate::quantize;

/// The endpoints a caller supplies to [`Map::create`]; `dx`/`dy` are derived
/// from these, not given directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapSpec {
    pub x0: f64,
    pub x1: f64,
    pub nx: usize,
    pub y0: f64,
    pub y1: f64,
    pub ny: usize,
    pub z0: f64,
    pub z1: f64,
}

/// The stored axis description of a [`Map`]: origin and step per axis, plus
/// the quantisation range. `dx`/`dy` are derived, not stored independently
/// of a `MapSpec`, so `Map::create` is the only producer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapInfo {
    pub x0: f64,
    pub dx: f64,
    pub nx: usize,
    pub y0: f64,
    pub dy: f64,
    pub ny: usize,
    pub z0: f64,
    pub z1: f64,
}

/// A regular grid of 16-bit quantised elevation, optionally projected.
#[derive(Debug, Clone)]
pub struct Map {
    pub(crate) info: MapInfo,
    pub(crate) dz: f64,
    pub(crate) projection: Projection,
    pub(crate) data: Vec<u16>,
}

impl Map {
    /// Create a zeroed map. `nx, ny` must be positive, `z0` must differ from `z1`.
    pub fn create(spec: MapSpec, projection_name: Option<&str>) -> Result<Map> {
        if spec.nx == 0 || spec.ny == 0 {
            return Err(raise!("Map::create", ErrorKind::DomainError, "nx/ny must be positive"));
        }
        if spec.z0 == spec.z1 {
            return Err(raise!("Map::create", ErrorKind::DomainError, "z0 must differ from z1"));
        }

        let dx = if spec.nx == 1 { 0.0 } else { (spec.x1 - spec.x0) / (spec.nx - 1) as f64 };
        let dy = if spec.ny == 1 { 0.0 } else { (spec.y1 - spec.y0) / (spec.ny - 1) as f64 };
        let dz = quantize::step(spec.z0, spec.z1);

        let projection = match projection_name {
            Some(name) => projection::configure(name)?,
            None => Projection::None,
        };

        let info = MapInfo {
            x0: spec.x0,
            dx,
            nx: spec.nx,
            y0: spec.y0,
            dy,
            ny: spec.ny,
            z0: spec.z0,
            z1: spec.z1,
        };
        let data = vec![0u16; info.nx * info.ny];

        Ok(Map { info, dz, projection, data })
    }

    /// Construct a map directly from a stored [`MapInfo`], pre-quantised
    /// `data`, and a projection. Used by codecs, which read `dx`/`dy`
    /// directly off disk rather than deriving them from endpoints.
    pub(crate) fn from_raw(info: MapInfo, dz: f64, projection: Projection, data: Vec<u16>) -> Map {
        Map { info, dz, projection, data }
    }

    /// Load a map from disk, dispatching on the file extension to a registered codec.
    pub fn load(path: &std::path::Path) -> Result<Map> {
        codec::load(path)
    }

    /// Write a map to disk via the codec registered for its extension.
    pub fn dump(&self, path: &std::path::Path) -> Result<()> {
        codec::dump(path, self)
    }

    /// Set the elevation of grid node `(ix, iy)`. `z` must lie within
    /// `[z0, z0 + 65535*dz]`; values outside are rejected rather than silently clamped.
    pub fn fill(&mut self, ix: usize, iy: usize, z: f64) -> Result<()> {
        if ix >= self.info.nx || iy >= self.info.ny {
            return Err(raise!("Map::fill", ErrorKind::DomainError, "({ix},{iy}) out of bounds"));
        }
        let z_max = self.info.z0 + 65535.0 * self.dz;
        if z < self.info.z0 || z > z_max {
            return Err(raise!("Map::fill", ErrorKind::DomainError, "z={z} outside [{}, {z_max}]", self.info.z0));
        }
        let idx = iy * self.info.nx + ix;
        self.data[idx] = quantize::encode(z, self.info.z0, self.dz);
        Ok(())
    }

    /// Read back the coordinates and elevation of grid node `(ix, iy)`.
    pub fn node(&self, ix: usize, iy: usize) -> Result<(f64, f64, f64)> {
        if ix >= self.info.nx || iy >= self.info.ny {
            return Err(raise!("Map::node", ErrorKind::DomainError, "({ix},{iy}) out of bounds"));
        }
        let x = self.info.x0 + ix as f64 * self.info.dx;
        let y = self.info.y0 + iy as f64 * self.info.dy;
        let z = quantize::decode(self.data[iy * self.info.nx + ix], self.info.z0, self.dz);
        Ok((x, y, z))
    }

    /// Bilinearly interpolate the elevation at `(x, y)`, reporting whether
    /// the query point lies inside the map rectangle. Never errors.
    pub fn elevation_inside(&self, x: f64, y: f64) -> (f64, bool) {
        let hx = (x - self.info.x0) / nonzero(self.info.dx);
        let hy = (y - self.info.y0) / nonzero(self.info.dy);
        let inside = hx >= 0.0 && hx <= (self.info.nx - 1) as f64 && hy >= 0.0 && hy <= (self.info.ny - 1) as f64;
        if !inside {
            return (0.0, false);
        }

        let ix0 = (hx.floor() as usize).min(self.info.nx.saturating_sub(2));
        let iy0 = (hy.floor() as usize).min(self.info.ny.saturating_sub(2));
        let tx = (hx - ix0 as f64).clamp(0.0, 1.0);
        let ty = (hy - iy0 as f64).clamp(0.0, 1.0);

        let ix1 = (ix0 + 1).min(self.info.nx - 1);
        let iy1 = (iy0 + 1).min(self.info.ny - 1);

        let z00 = self.z_at(ix0, iy0);
        let z10 = self.z_at(ix1, iy0);
        let z01 = self.z_at(ix0, iy1);
        let z11 = self.z_at(ix1, iy1);

        let z0 = z00 * (1.0 - tx) + z10 * tx;
        let z1 = z01 * (1.0 - tx) + z11 * tx;
        (z0 * (1.0 - ty) + z1 * ty, true)
    }

    /// As [`Map::elevation_inside`], but fails with `DomainError` when the
    /// point lies outside the map rectangle, for callers that did not opt
    /// into an explicit `inside` flag.
    pub fn elevation(&self, x: f64, y: f64) -> Result<f64> {
        let (z, inside) = self.elevation_inside(x, y);
        if inside {
            Ok(z)
        } else {
            Err(raise!("Map::elevation", ErrorKind::DomainError, "({x},{y}) outside map rectangle"))
        }
    }

    fn z_at(&self, ix: usize, iy: usize) -> f64 {
        quantize::decode(self.data[iy * self.info.nx + ix], self.info.z0, self.dz)
    }

    /// Axis ranges and the projection's textual name.
    pub fn meta(&self) -> (MapInfo, String) {
        (self.info, projection::name(&self.projection))
    }

    pub fn info(&self) -> MapInfo {
        self.info
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn dz(&self) -> f64 {
        self.dz
    }

    pub fn data(&self) -> &[u16] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u16] {
        &mut self.data
    }
}

impl MapInfo {
    pub fn x1(&self) -> f64 {
        self.x0 + self.dx * (self.nx.max(1) - 1) as f64
    }

    pub fn y1(&self) -> f64 {
        self.y0 + self.dy * (self.ny.max(1) - 1) as f64
    }
}

fn nonzero(v: f64) -> f64 {
    if v == 0.0 {
        1.0
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> Map {
        let spec = MapSpec {
            x0: 0.0,
            x1: 2.0,
            nx: 3,
            y0: 0.0,
            y1: 2.0,
            ny: 3,
            z0: 0.0,
            z1: 1000.0,
        };
        Map::create(spec, None).unwrap()
    }

    #[test]
    fn create_computes_steps() {
        let m = sample_map();
        assert_eq!(m.info.dx, 1.0);
        assert!(m.data.iter().all(|&v| v == 0));
    }

    #[test]
    fn rejects_degenerate_z_range() {
        let spec = MapSpec { x0: 0.0, x1: 1.0, nx: 2, y0: 0.0, y1: 1.0, ny: 2, z0: 5.0, z1: 5.0 };
        assert!(Map::create(spec, None).is_err());
    }

    #[test]
    fn fill_and_node_roundtrip() {
        let mut m = sample_map();
        let spec = MapSpec { x0: 0.0, x1: 1.0, nx: 2, y0: 0.0, y1: 1.0, ny: 2, z0: 0.0, z1: 1000.0 };
        let mut m2 = Map::create(spec, None).unwrap();
        m2.fill(1, 1, 500.0).unwrap();
        let (_, _, z) = m2.node(1, 1).unwrap();
        assert!((z - 500.0).abs() <= m2.dz);
        let _ = &mut m;
    }

    #[test]
    fn fill_rejects_out_of_range_z() {
        let spec = MapSpec { x0: 0.0, x1: 1.0, nx: 2, y0: 0.0, y1: 1.0, ny: 2, z0: 0.0, z1: 1000.0 };
        let mut m = Map::create(spec, None).unwrap();
        assert!(m.fill(0, 0, 2000.0).is_err());
    }

    #[test]
    fn bilinear_checkerboard_midpoint() {
        // Spec S2: 201x201 grid of alternating 0/1000, centre value ~500.
        let n = 201usize;
        let spec = MapSpec { x0: 0.0, x1: (n - 1) as f64, nx: n, y0: 0.0, y1: (n - 1) as f64, ny: n, z0: 0.0, z1: 1000.0 };
        let mut m = Map::create(spec, None).unwrap();
        for j in 0..n {
            for i in 0..n {
                let z = if (i * n + j) % 2 == 0 { 0.0 } else { 1000.0 };
                m.fill(i, j, z).unwrap();
            }
        }
        let mid = (n / 2) as f64;
        let (z, inside) = m.elevation_inside(mid + 0.5, mid + 0.5);
        assert!(inside);
        assert!((z - 500.0).abs() < 1.0, "got {z}");
    }

    #[test]
    fn elevation_outside_is_domain_error() {
        let m = sample_map();
        assert!(m.elevation(-5.0, -5.0).is_err());
        let (_, inside) = m.elevation_inside(-5.0, -5.0);
        assert!(!inside);
    }
}

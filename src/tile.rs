//! A single tile of the worldwide archive (component E): a [`Map`] with
//! geographic axes and no projection, plus its integer cell identity.
//!
//! Pin count and LRU linkage conceptually belong to the tile (spec §3), but
//! here they live in the Stack's own arena slot instead: the Stack hands
//! tiles to Clients as `Arc<Tile>`, so a Client's fast path can read a
//! pinned tile's elevation without taking the Stack's lock, matching the
//! "tiles are append-only, never rewritten" concurrency note (spec §5).
//! Mutable bookkeeping (`clients`, `prev`/`next`) stays behind the lock,
//! in `stack::Slot`.

use crate::map::Map;

/// A worldwide-archive tile. Created and destroyed only by its owning Stack.
#[derive(Debug)]
pub struct Tile {
    pub(crate) map: Map,
    pub(crate) lat_cell: i32,
    pub(crate) lon_cell: i32,
}

impl Tile {
    /// Wrap a loaded geographic map as a tile, deriving its integer cell
    /// identity `(lat_cell, lon_cell) = (floor(y0), floor(x0))`.
    pub(crate) fn from_map(map: Map) -> Tile {
        let info = map.info();
        Tile {
            lat_cell: info.y0.floor() as i32,
            lon_cell: info.x0.floor() as i32,
            map,
        }
    }

    pub fn cell(&self) -> (i32, i32) {
        (self.lat_cell, self.lon_cell)
    }

    /// Whether `(lat, lon)` falls inside this tile's map rectangle.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.map.elevation_inside(lon, lat).1
    }

    /// Bilinear elevation lookup; axes are `(x=lon, y=lat)` per the geographic
    /// convention fixed for tiles.
    pub fn elevation_inside(&self, lat: f64, lon: f64) -> (f64, bool) {
        self.map.elevation_inside(lon, lat)
    }

    pub fn map(&self) -> &Map {
        &self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MapSpec;

    fn tile_at(lat_cell: i32, lon_cell: i32) -> Tile {
        let spec = MapSpec {
            x0: lon_cell as f64,
            x1: lon_cell as f64 + 1.0,
            nx: 2,
            y0: lat_cell as f64,
            y1: lat_cell as f64 + 1.0,
            ny: 2,
            z0: 0.0,
            z1: 1000.0,
        };
        Tile::from_map(Map::create(spec, None).unwrap())
    }

    #[test]
    fn cell_identity_from_origin() {
        let t = tile_at(45, 3);
        assert_eq!(t.cell(), (45, 3));
    }

    #[test]
    fn contains_checks_rectangle() {
        let t = tile_at(45, 3);
        assert!(t.contains(45.5, 3.5));
        assert!(!t.contains(46.5, 3.5));
    }
}

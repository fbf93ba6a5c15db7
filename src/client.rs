//! Per-session cursor over a [`Stack`] (component G): pins at most one
//! tile, offering a lock-free fast path when the pinned tile already
//! covers the query point.

use std::sync::Arc;

use crate::error::{raise, ErrorKind, Result};
use crate::stack::Stack;
use crate::tile::Tile;

/// A cursor holding at most one pinned [`Tile`] of a specific [`Stack`].
pub struct Client<'s> {
    stack: &'s Stack,
    tile: Option<Arc<Tile>>,
    index: Option<usize>,
}

impl<'s> Client<'s> {
    /// Create an idle client. Fails with `BadAddress` unless `stack` was
    /// built `shareable` (spec §4.G: "requires the stack's lock/unlock
    /// callbacks to be set").
    pub fn create(stack: &'s Stack) -> Result<Client<'s>> {
        if !stack.is_shareable() {
            return Err(raise!("Client::create", ErrorKind::BadAddress, "stack is not shareable"));
        }
        Ok(Client { stack, tile: None, index: None })
    }

    /// Never fails on a missing tile: an unregistered cell reports `inside = false`.
    pub fn elevation_inside(&mut self, lat: f64, lon: f64) -> Result<(f64, bool)> {
        if let Some(t) = &self.tile {
            if t.contains(lat, lon) {
                return Ok(t.elevation_inside(lat, lon));
            }
        }

        let prev_index = self.index;
        let max_size = self.stack.max_size();
        let cell_paths = self.stack.cell_paths();

        let found = self.stack.with_core(|core| -> Result<Option<usize>> {
            let new_idx = if let Some(idx) = core.find_containing(lat, lon, prev_index) {
                core.touch(idx);
                idx
            } else {
                let cell = (lat.floor() as i32, lon.floor() as i32);
                match Stack::load_into(core, max_size, cell_paths, cell) {
                    Ok(idx) => idx,
                    Err(e) if e.kind == ErrorKind::PathError => return Ok(None),
                    Err(e) => return Err(e),
                }
            };

            // Every switch to a different tile re-pins, whether that tile was
            // already resident (found by scan) or freshly loaded: spec §4.G
            // steps 4-5 apply to both, not just a fresh load.
            if let Some(old_idx) = prev_index {
                core.release(old_idx, max_size);
            }
            core.reserve(new_idx);
            Ok(Some(new_idx))
        })?;

        let Some(new_idx) = found else {
            return Ok((0.0, false));
        };

        let new_tile = self.stack.with_core(|core| core.tile(new_idx));
        self.index = Some(new_idx);
        self.tile = Some(new_tile.clone());
        Ok(new_tile.elevation_inside(lat, lon))
    }

    /// As [`Client::elevation_inside`], but fails with `PathError` when no
    /// tile is registered for the query point.
    pub fn elevation(&mut self, lat: f64, lon: f64) -> Result<f64> {
        let (z, inside) = self.elevation_inside(lat, lon)?;
        if inside {
            Ok(z)
        } else {
            Err(raise!("Client::elevation", ErrorKind::PathError, "no tile registered for ({lat},{lon})"))
        }
    }

    /// Release the pinned tile, if any.
    pub fn clear(&mut self) -> Result<()> {
        if let Some(idx) = self.index.take() {
            let max_size = self.stack.max_size();
            self.stack.with_core(|core| core.release(idx, max_size));
        }
        self.tile = None;
        Ok(())
    }

    pub fn is_pinned(&self) -> bool {
        self.tile.is_some()
    }
}

impl<'s> Drop for Client<'s> {
    fn drop(&mut self) {
        if let Err(e) = self.clear() {
            log::warn!("Client::drop: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MapSpec;

    fn write_tile(dir: &std::path::Path, lat: i32, lon: i32) {
        let name = format!("N{lat:02}E{lon:03}.grd");
        let spec = MapSpec { x0: lon as f64, x1: lon as f64 + 1.0, nx: 2, y0: lat as f64, y1: lat as f64 + 1.0, ny: 2, z0: 0.0, z1: 1000.0 };
        let mut map = crate::map::Map::create(spec, None).unwrap();
        map.fill(0, 0, 100.0).unwrap();
        map.fill(1, 0, 100.0).unwrap();
        map.fill(0, 1, 100.0).unwrap();
        map.fill(1, 1, 100.0).unwrap();
        map.dump(&dir.join(name)).unwrap();
    }

    #[test]
    fn create_requires_shareable_stack() {
        let dir = tempfile::tempdir().unwrap();
        let stack = Stack::create(dir.path(), 4, false).unwrap();
        assert!(Client::create(&stack).is_err());
    }

    #[test]
    fn s4_pinned_tile_survives_eviction() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), 45, 3);
        for (lat, lon) in [(10, 10), (11, 11), (12, 12), (13, 13)] {
            write_tile(dir.path(), lat, lon);
        }

        let stack = Stack::create(dir.path(), 1, true).unwrap();
        let mut c1 = Client::create(&stack).unwrap();
        let mut c2 = Client::create(&stack).unwrap();
        c1.elevation_inside(45.5, 3.5).unwrap();
        c2.elevation_inside(45.5, 3.5).unwrap();

        let mut c3 = Client::create(&stack).unwrap();
        for (lat, lon) in [(10, 10), (11, 11), (12, 12), (13, 13)] {
            c3.elevation_inside(lat as f64 + 0.5, lon as f64 + 0.5).unwrap();
        }

        assert!(stack.resident_cells().contains(&(45, 3)));
        let (_, inside) = c1.elevation_inside(45.5, 3.5).unwrap();
        assert!(inside);
    }

    #[test]
    fn switch_to_resident_tile_repins() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), 45, 3);
        write_tile(dir.path(), 46, 3);

        let stack = Stack::create(dir.path(), 1, true).unwrap();

        let mut c3 = Client::create(&stack).unwrap();
        c3.elevation_inside(45.5, 3.5).unwrap();
        assert!(stack.resident_cells().contains(&(45, 3)));

        let mut c4 = Client::create(&stack).unwrap();
        c4.elevation_inside(46.5, 3.5).unwrap();
        // Both tiles are pinned, so the max_size=1 bound is transiently exceeded.
        assert_eq!(stack.resident_cells().len(), 2);

        // c3 switches from its pinned tile to the already-resident other
        // tile: the old pin must be released (and, since the stack is now
        // over its bound with that tile unpinned, evicted) and the new
        // tile must be reserved on c3's behalf.
        let (_, inside) = c3.elevation_inside(46.5, 3.5).unwrap();
        assert!(inside);
        assert!(!stack.resident_cells().contains(&(45, 3)), "old pin was never released");
        assert!(stack.resident_cells().contains(&(46, 3)));

        // The surviving tile is now pinned by both c3 and c4: releasing
        // one must not evict it while the other still holds it.
        c4.clear().unwrap();
        assert!(stack.resident_cells().contains(&(46, 3)), "still held by c3");

        c3.clear().unwrap();
    }

    #[test]
    fn clear_releases_pin() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), 45, 3);
        let stack = Stack::create(dir.path(), 4, true).unwrap();
        let mut c = Client::create(&stack).unwrap();
        c.elevation_inside(45.5, 3.5).unwrap();
        assert!(c.is_pinned());
        c.clear().unwrap();
        assert!(!c.is_pinned());
    }
}

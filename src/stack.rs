//! Bounded LRU tile cache with concurrent client access (component F).
//!
//! Lock/unlock callbacks (spec §9 design note) map here to a `shareable`
//! flag plus a `parking_lot::Mutex` guarding the mutable arena: a stack
//! built `shareable` accepts [`crate::client::Client`]s, which borrow the
//! mutex only around the critical section of each lookup (spec §5); a
//! non-shareable stack only supports the single-thread `elevation`/`clear`/
//! `load` entry points directly on `Stack` itself.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::codec;
use crate::error::{raise, ErrorKind, Result};
use crate::tile::Tile;

type Cell = (i32, i32);

struct Slot {
    tile: Arc<Tile>,
    clients: u32,
    prev: Option<usize>,
    next: Option<usize>,
}

pub(crate) struct Core {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    resident: HashMap<Cell, usize>,
    size: usize,
}

impl Core {
    fn new() -> Core {
        Core { slots: Vec::new(), free: Vec::new(), head: None, tail: None, resident: HashMap::new(), size: 0 }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let slot = self.slots[idx].as_ref().expect("unlink of empty slot");
            (slot.prev, slot.next)
        };
        match prev {
            Some(p) => self.slots[p].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }
    }

    fn push_head(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let slot = self.slots[idx].as_mut().unwrap();
            slot.prev = None;
            slot.next = old_head;
        }
        if let Some(h) = old_head {
            self.slots[h].as_mut().unwrap().prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    pub(crate) fn touch(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.push_head(idx);
    }

    pub(crate) fn insert(&mut self, cell: Cell, tile: Tile) -> usize {
        let slot = Slot { tile: Arc::new(tile), clients: 0, prev: None, next: None };
        let idx = match self.free.pop() {
            Some(i) => {
                self.slots[i] = Some(slot);
                i
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.push_head(idx);
        self.resident.insert(cell, idx);
        self.size += 1;
        idx
    }

    fn remove(&mut self, idx: usize) {
        self.unlink(idx);
        let slot = self.slots[idx].take().expect("remove of empty slot");
        let cell = slot.tile.cell();
        self.resident.remove(&cell);
        self.free.push(idx);
        self.size -= 1;
    }

    /// Scan from head to tail (most- to least-recently-used) for a tile
    /// containing `(lat, lon)`, skipping `exclude`.
    pub(crate) fn find_containing(&self, lat: f64, lon: f64, exclude: Option<usize>) -> Option<usize> {
        let mut cur = self.head;
        while let Some(idx) = cur {
            let slot = self.slots[idx].as_ref().unwrap();
            if Some(idx) != exclude && slot.tile.contains(lat, lon) {
                return Some(idx);
            }
            cur = slot.next;
        }
        None
    }

    /// Evict the least-recently-used unpinned tile, if one exists.
    pub(crate) fn evict_lru_unpinned(&mut self) -> bool {
        let mut cur = self.tail;
        while let Some(idx) = cur {
            let slot = self.slots[idx].as_ref().unwrap();
            if slot.clients == 0 {
                self.remove(idx);
                return true;
            }
            cur = slot.prev;
        }
        false
    }

    pub(crate) fn release(&mut self, idx: usize, max_size: i64) {
        let slot = self.slots[idx].as_mut().unwrap();
        debug_assert!(slot.clients > 0);
        slot.clients -= 1;
        if slot.clients == 0 && max_size > 0 && self.size as i64 > max_size {
            self.remove(idx);
        }
    }

    pub(crate) fn reserve(&mut self, idx: usize) {
        self.slots[idx].as_mut().unwrap().clients += 1;
    }

    pub(crate) fn tile(&self, idx: usize) -> Arc<Tile> {
        self.slots[idx].as_ref().unwrap().tile.clone()
    }
}

/// Bounded LRU cache of worldwide-archive tiles.
pub struct Stack {
    cell_paths: HashMap<Cell, PathBuf>,
    max_size: i64,
    shareable: bool,
    core: Mutex<Core>,
}

/// Parse a cell-name stem into `(lat_cell, lon_cell)`. Accepts both
/// `N45E002`/`S01W122` (HGT-style) and `45N_002E`/`01S_122W` forms.
fn parse_cell_name(stem: &str) -> Option<Cell> {
    let bytes = stem.as_bytes();
    if let Some(&first) = bytes.first() {
        if first.is_ascii_alphabetic() {
            let lat_sign = match first {
                b'N' | b'n' => 1,
                b'S' | b's' => -1,
                _ => return None,
            };
            let digits_end = stem[1..].find(|c: char| !c.is_ascii_digit())? + 1;
            let lat: i32 = stem[1..digits_end].parse().ok()?;
            let rest = &stem[digits_end..];
            let lon_sign = match rest.as_bytes().first()? {
                b'E' | b'e' => 1,
                b'W' | b'w' => -1,
                _ => return None,
            };
            let lon: i32 = rest[1..].trim_end_matches(|c: char| !c.is_ascii_digit()).parse().ok()?;
            return Some((lat_sign * lat, lon_sign * lon));
        }
    }

    // "45N_002E" form.
    let (lat_part, lon_part) = stem.split_once('_')?;
    let lat_letter = lat_part.chars().last()?;
    let lat_sign = match lat_letter {
        'N' | 'n' => 1,
        'S' | 's' => -1,
        _ => return None,
    };
    let lat: i32 = lat_part[..lat_part.len() - 1].parse().ok()?;

    let lon_letter = lon_part.chars().last()?;
    let lon_sign = match lon_letter {
        'E' | 'e' => 1,
        'W' | 'w' => -1,
        _ => return None,
    };
    let lon: i32 = lon_part[..lon_part.len() - 1].parse().ok()?;

    Some((lat_sign * lat, lon_sign * lon))
}

impl Stack {
    /// Scan `root` once for codec-recognised files, parsing each name as a
    /// geographic cell. `max_size <= 0` means unbounded. `shareable` governs
    /// whether [`crate::client::Client`]s may attach (spec §4.F/§4.G).
    pub fn create(root: &Path, max_size: i64, shareable: bool) -> Result<Stack> {
        let mut cell_paths = HashMap::new();
        let entries = std::fs::read_dir(root)
            .map_err(|e| raise!("Stack::create", ErrorKind::PathError, "{root:?}: {e}"))?;
        for entry in entries {
            let entry = entry.map_err(|e| raise!("Stack::create", ErrorKind::PathError, "{root:?}: {e}"))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default().to_ascii_lowercase();
            if !codec::supported(&ext) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(OsStr::to_str) else { continue };
            if let Some(cell) = parse_cell_name(stem) {
                cell_paths.insert(cell, path);
            }
        }

        Ok(Stack { cell_paths, max_size, shareable, core: Mutex::new(Core::new()) })
    }

    pub fn is_shareable(&self) -> bool {
        self.shareable
    }

    pub fn max_size(&self) -> i64 {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.core.lock().size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resident tiles, most-recently-used first, as `(lat_cell, lon_cell)`.
    pub fn resident_cells(&self) -> Vec<Cell> {
        let core = self.core.lock();
        let mut cells = Vec::with_capacity(core.size);
        let mut cur = core.head;
        while let Some(idx) = cur {
            let slot = core.slots[idx].as_ref().unwrap();
            cells.push(slot.tile.cell());
            cur = slot.next;
        }
        cells
    }

    pub(crate) fn load_into(core: &mut Core, max_size: i64, cell_paths: &HashMap<Cell, PathBuf>, cell: Cell) -> Result<usize> {
        let path = cell_paths
            .get(&cell)
            .ok_or_else(|| raise!("Stack::elevation", ErrorKind::PathError, "no tile registered for cell {cell:?}"))?;
        let map = codec::load(path)?;
        if max_size > 0 && core.size as i64 >= max_size {
            core.evict_lru_unpinned();
        }
        Ok(core.insert(cell, Tile::from_map(map)))
    }

    /// Never fails on a missing tile: an unregistered cell reports `inside = false`.
    pub fn elevation_inside(&self, lat: f64, lon: f64) -> Result<(f64, bool)> {
        let mut core = self.core.lock();

        if let Some(idx) = core.head {
            let slot = core.slots[idx].as_ref().unwrap();
            if slot.tile.contains(lat, lon) {
                return Ok(slot.tile.elevation_inside(lat, lon));
            }
        }

        if let Some(idx) = core.find_containing(lat, lon, None) {
            core.touch(idx);
            let slot = core.slots[idx].as_ref().unwrap();
            return Ok(slot.tile.elevation_inside(lat, lon));
        }

        let cell = (lat.floor() as i32, lon.floor() as i32);
        match Self::load_into(&mut core, self.max_size, &self.cell_paths, cell) {
            Ok(idx) => {
                let slot = core.slots[idx].as_ref().unwrap();
                Ok(slot.tile.elevation_inside(lat, lon))
            }
            Err(e) if e.kind == ErrorKind::PathError => Ok((0.0, false)),
            Err(e) => Err(e),
        }
    }

    /// As [`Stack::elevation_inside`], but fails with `PathError` when no
    /// tile is registered for the query point.
    pub fn elevation(&self, lat: f64, lon: f64) -> Result<f64> {
        let (z, inside) = self.elevation_inside(lat, lon)?;
        if inside {
            Ok(z)
        } else {
            Err(raise!("Stack::elevation", ErrorKind::PathError, "no tile registered for ({lat},{lon})"))
        }
    }

    /// Evict every tile with `clients == 0`.
    pub fn clear(&self) -> Result<()> {
        let mut core = self.core.lock();
        loop {
            let mut cur = core.tail;
            let mut evicted = false;
            while let Some(idx) = cur {
                let slot = core.slots[idx].as_ref().unwrap();
                let prev = slot.prev;
                if slot.clients == 0 {
                    core.remove(idx);
                    evicted = true;
                    break;
                }
                cur = prev;
            }
            if !evicted {
                break;
            }
        }
        Ok(())
    }

    /// Eagerly load up to `max_size` registered tiles (or all, if unbounded).
    pub fn load(&self) -> Result<()> {
        let mut core = self.core.lock();
        let limit = if self.max_size > 0 { self.max_size as usize } else { usize::MAX };
        let cells: Vec<Cell> = self.cell_paths.keys().copied().collect();
        for cell in cells {
            if core.size >= limit {
                break;
            }
            if core.resident.contains_key(&cell) {
                continue;
            }
            Self::load_into(&mut core, self.max_size, &self.cell_paths, cell)?;
        }
        Ok(())
    }

    pub(crate) fn with_core<T>(&self, f: impl FnOnce(&mut Core) -> T) -> T {
        f(&mut self.core.lock())
    }

    pub(crate) fn cell_paths(&self) -> &HashMap<Cell, PathBuf> {
        &self.cell_paths
    }
}

impl Core {
    pub(crate) fn size(&self) -> usize {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MapSpec;
    use std::io::Write;

    fn write_tile(dir: &Path, lat: i32, lon: i32) {
        let ns = if lat >= 0 { "N" } else { "S" };
        let ew = if lon >= 0 { "E" } else { "W" };
        let name = format!("{ns}{:02}{ew}{:03}.grd", lat.abs(), lon.abs());
        let spec = MapSpec {
            x0: lon as f64,
            x1: lon as f64 + 1.0,
            nx: 2,
            y0: lat as f64,
            y1: lat as f64 + 1.0,
            ny: 2,
            z0: 0.0,
            z1: 1000.0,
        };
        let mut map = crate::map::Map::create(spec, None).unwrap();
        map.fill(0, 0, 100.0).unwrap();
        map.fill(1, 0, 100.0).unwrap();
        map.fill(0, 1, 100.0).unwrap();
        map.fill(1, 1, 100.0).unwrap();
        map.dump(&dir.join(name)).unwrap();
    }

    fn touch_noise_file(dir: &Path) {
        let mut f = std::fs::File::create(dir.join("readme.txt")).unwrap();
        writeln!(f, "not a tile").unwrap();
    }

    #[test]
    fn parses_both_cell_name_forms() {
        assert_eq!(parse_cell_name("N45E002"), Some((45, 2)));
        assert_eq!(parse_cell_name("S01W122"), Some((-1, -122)));
        assert_eq!(parse_cell_name("45N_002E"), Some((45, 2)));
        assert_eq!(parse_cell_name("01S_122W"), Some((-1, -122)));
        assert_eq!(parse_cell_name("garbage"), None);
    }

    #[test]
    fn lru_eviction_s3() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), 45, 3);
        write_tile(dir.path(), 46, 3);
        write_tile(dir.path(), 45, 2);
        touch_noise_file(dir.path());

        let stack = Stack::create(dir.path(), 2, false).unwrap();
        stack.elevation_inside(45.5, 3.5).unwrap();
        stack.elevation_inside(46.5, 3.5).unwrap();
        stack.elevation_inside(45.5, 2.5).unwrap();

        assert_eq!(stack.resident_cells(), vec![(45, 2), (46, 3)]);
    }

    #[test]
    fn missing_cell_reports_outside() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), 45, 3);
        let stack = Stack::create(dir.path(), 4, false).unwrap();

        let (_, inside) = stack.elevation_inside(0.0, 0.0).unwrap();
        assert!(!inside);
        assert!(stack.elevation(0.0, 0.0).is_err());
    }

    #[test]
    fn eager_load_respects_max_size() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), 1, 1);
        write_tile(dir.path(), 2, 2);
        write_tile(dir.path(), 3, 3);
        let stack = Stack::create(dir.path(), 2, false).unwrap();
        stack.load().unwrap();
        assert_eq!(stack.len(), 2);
    }
}

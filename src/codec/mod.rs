//! Abstract codec interface and the extension-keyed registry (component C).
//!
//! Concrete file formats are external collaborators to THE CORE; what lives
//! here is the interface plus small concrete implementations so `Map::load`
//! and `Map::dump` are exercisable end to end (spec §4.C, §6).

mod asc;
mod geotiff;
mod grd;
mod hgt;
mod png;

use std::path::Path;

use crate::error::{raise, ErrorKind, Result};
use crate::map::Map;

/// A file-format codec: open/read/write for one or more extensions.
///
/// Per spec §4.C a codec also installs per-cell `get_z`/`set_z` accessors on
/// the map it produces; here that's just the `Map`'s own quantised buffer,
/// since every codec we implement converges on the same in-memory layout.
pub trait Codec: Sync {
    /// Lower-case extensions this codec claims, without the leading dot.
    fn extensions(&self) -> &'static [&'static str];

    fn load(&self, path: &Path) -> Result<Map>;

    fn dump(&self, path: &Path, map: &Map) -> Result<()>;
}

fn registry() -> &'static [&'static dyn Codec] {
    static PNG: png::PngCodec = png::PngCodec;
    static GRD: grd::GrdCodec = grd::GrdCodec;
    static ASC: asc::AscCodec = asc::AscCodec;
    static HGT: hgt::HgtCodec = hgt::HgtCodec;
    static GEOTIFF: geotiff::GeoTiffCodec = geotiff::GeoTiffCodec;
    &[&PNG, &GRD, &ASC, &HGT, &GEOTIFF]
}

fn extension_of(path: &Path) -> Result<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .ok_or_else(|| raise!("codec::extension_of", ErrorKind::BadExtension, "no extension in {path:?}"))
}

fn find(ext: &str) -> Option<&'static dyn Codec> {
    registry().iter().copied().find(|c| c.extensions().contains(&ext))
}

/// Whether some registered codec claims `ext` (a lower-case extension, no dot).
pub(crate) fn supported(ext: &str) -> bool {
    find(ext).is_some()
}

pub(crate) fn load(path: &Path) -> Result<Map> {
    let ext = extension_of(path)?;
    let codec = find(&ext).ok_or_else(|| raise!("codec::load", ErrorKind::BadExtension, "no codec registered for .{ext}"))?;
    codec.load(path)
}

pub(crate) fn dump(path: &Path, map: &Map) -> Result<()> {
    let ext = extension_of(path)?;
    let codec = find(&ext).ok_or_else(|| raise!("codec::dump", ErrorKind::BadExtension, "no codec registered for .{ext}"))?;
    codec.dump(path, map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_extension_is_bad_extension() {
        let err = load(Path::new("terrain.xyz")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadExtension);
    }

    #[test]
    fn no_extension_is_bad_extension() {
        let err = load(Path::new("terrain")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadExtension);
    }
}

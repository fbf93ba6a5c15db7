//! GeoTIFF codec — declared in the registry but deliberately unimplemented.
//!
//! A real GeoTIFF reader/writer needs libtiff-style tag parsing that, done
//! faithfully, means binding a C library; that's out of reach for a
//! from-scratch rewrite and squarely inside the "concrete file-format
//! codecs" the core spec places out of scope. Kept registered (so `.tif`
//! resolves to a codec rather than `BadExtension`) but every entry point
//! fails with `BadFormat`.

use std::path::Path;

use crate::error::{raise, ErrorKind, Result};
use crate::map::Map;

use super::Codec;

pub(crate) struct GeoTiffCodec;

impl Codec for GeoTiffCodec {
    fn extensions(&self) -> &'static [&'static str] {
        &["tif", "tiff"]
    }

    fn load(&self, path: &Path) -> Result<Map> {
        Err(raise!("GeoTiffCodec::load", ErrorKind::BadFormat, "{path:?}: GeoTIFF is not implemented"))
    }

    fn dump(&self, path: &Path, _map: &Map) -> Result<()> {
        Err(raise!("GeoTiffCodec::dump", ErrorKind::BadFormat, "{path:?}: GeoTIFF is not implemented"))
    }
}

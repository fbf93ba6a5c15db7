//! `turtle` — geometric transport of particles through topographic media.
//!
//! Answers two questions: "what is the ground elevation at this point?" and
//! "how far along this ray until it crosses the ground?". Built from eight
//! components, bottom to top:
//!
//! - [`ellipsoid`] — WGS84 ECEF ↔ geodetic conversion (component A)
//! - [`projection`] — Lambert conformal conic and UTM (component B)
//! - [`codec`] — file-format codecs behind a common [`map::Map`] interface (component C)
//! - [`map`] — the in-memory regular elevation grid (component D)
//! - [`tile`] — an immutable, cell-identified [`map::Map`] (component E)
//! - [`stack`] — a bounded LRU cache of tiles with concurrent client access (component F)
//! - [`client`] — a per-session cursor pinning at most one tile (component G)
//! - [`stepper`] — layered ground geometry with adaptive stepping (component H)

pub mod client;
pub mod codec;
pub mod ellipsoid;
pub mod error;
pub mod map;
pub mod projection;
mod quantize;
pub mod stack;
pub mod stepper;
pub mod tile;

pub use client::Client;
pub use ellipsoid::{ecef_from_geodetic, ecef_to_geodetic, Direction, Ecef, Geodetic};
pub use error::{clear_error_handler, reset_error_handler, set_error_handler, Error, ErrorHandler, ErrorKind, Result};
pub use map::{Map, MapInfo, MapSpec};
pub use projection::Projection;
pub use stack::Stack;
pub use stepper::{DataIndex, Elevation, StepResult, Stepper};
pub use tile::Tile;

//! Layered ground geometry with adaptive stepping (component H).
//!
//! A stepper is an ordered list of [`Layer`]s; each layer is an ordered list
//! of [`DataEntry`] samplers (`Flat` / `Map` / `Stack`). Sampling a
//! geographic point scans a layer's entries in order and keeps the *last*
//! one that reports `inside`; across layers, the first layer (highest
//! priority, per spec resolution of the priority-direction ambiguity) whose
//! top entry is inside wins.

use std::sync::Arc;

use crate::client::Client;
use crate::ellipsoid::{self, Direction, Ecef, Geodetic};
use crate::error::{raise, ErrorKind, Result};
use crate::map::Map;
use crate::projection::Projection;
use crate::stack::Stack;

/// Metres per degree of latitude, used only to decide when an [`Lla`] cache
/// needs refreshing — a rough conversion, not a projection.
const METRES_PER_DEGREE: f64 = 111_320.0;

/// A per-Data-entry linearisation of a [`Projection`]'s forward transform,
/// anchored at a reference geographic point. Re-initialised whenever a
/// query strays more than `local_range` metres from the anchor.
#[derive(Debug, Clone, Copy)]
struct Lla {
    ref_lat: f64,
    ref_lon: f64,
    ref_xy: (f64, f64),
    jacobian: [[f64; 2]; 2],
}

impl Lla {
    fn compute(projection: &Projection, lat: f64, lon: f64) -> Lla {
        const EPS: f64 = 1e-5;
        let (x0, y0) = projection.project(lat, lon);
        let (x_lat, y_lat) = projection.project(lat + EPS, lon);
        let (x_lon, y_lon) = projection.project(lat, lon + EPS);
        Lla {
            ref_lat: lat,
            ref_lon: lon,
            ref_xy: (x0, y0),
            jacobian: [[(x_lat - x0) / EPS, (x_lon - x0) / EPS], [(y_lat - y0) / EPS, (y_lon - y0) / EPS]],
        }
    }

    fn distance_m(&self, lat: f64, lon: f64) -> f64 {
        let dlat = (lat - self.ref_lat) * METRES_PER_DEGREE;
        let dlon = (lon - self.ref_lon) * METRES_PER_DEGREE * self.ref_lat.to_radians().cos();
        dlat.hypot(dlon)
    }

    fn apply(&self, lat: f64, lon: f64) -> (f64, f64) {
        let dlat = lat - self.ref_lat;
        let dlon = lon - self.ref_lon;
        let x = self.ref_xy.0 + self.jacobian[0][0] * dlat + self.jacobian[0][1] * dlon;
        let y = self.ref_xy.1 + self.jacobian[1][0] * dlat + self.jacobian[1][1] * dlon;
        (x, y)
    }
}

/// Project `(lat, lon)` through `projection`, using and maintaining `lla` as
/// a local-linear cache. `local_range <= 0` disables the cache.
fn project_cached(lla: &mut Option<Lla>, projection: &Projection, local_range: f64, lat: f64, lon: f64) -> (f64, f64) {
    if local_range <= 0.0 {
        return projection.project(lat, lon);
    }
    let stale = match lla {
        Some(t) => t.distance_m(lat, lon) > local_range,
        None => true,
    };
    if stale {
        *lla = Some(Lla::compute(projection, lat, lon));
    }
    lla.as_ref().unwrap().apply(lat, lon)
}

enum DataSource {
    Flat,
    Map(Map),
    Stack(Arc<Stack>),
}

/// One ground-data sampler within a [`Layer`].
struct DataEntry {
    source: DataSource,
    offset: f64,
    /// `Projection::None` for `Flat`/`Stack` entries: only `Map` entries
    /// need the forward transform this caches.
    projection: Projection,
    lla: Option<Lla>,
}

impl DataEntry {
    fn flat(offset: f64) -> DataEntry {
        DataEntry { source: DataSource::Flat, offset, projection: Projection::None, lla: None }
    }

    fn map(map: Map, offset: f64) -> DataEntry {
        let projection = map.projection();
        DataEntry { source: DataSource::Map(map), offset, projection, lla: None }
    }

    fn stack(stack: Arc<Stack>, offset: f64) -> DataEntry {
        DataEntry { source: DataSource::Stack(stack), offset, projection: Projection::None, lla: None }
    }

    /// `Some(ground_elevation)` if the point is inside this entry's data, `None` otherwise.
    fn sample(&mut self, local_range: f64, lat: f64, lon: f64) -> Result<Option<f64>> {
        let offset = self.offset;
        match &self.source {
            DataSource::Flat => Ok(Some(offset)),
            DataSource::Map(map) => {
                let (x, y) = project_cached(&mut self.lla, &self.projection, local_range, lat, lon);
                let (z, inside) = map.elevation_inside(x, y);
                Ok(if inside { Some(z + offset) } else { None })
            }
            DataSource::Stack(stack) => {
                let stack = Arc::clone(stack);
                let (z, inside) = if stack.is_shareable() {
                    let mut client = Client::create(&stack)?;
                    client.elevation_inside(lat, lon)?
                } else {
                    stack.elevation_inside(lat, lon)?
                };
                Ok(if inside { Some(z + offset) } else { None })
            }
        }
    }
}

struct Layer {
    entries: Vec<DataEntry>,
}

impl Layer {
    /// The last entry (highest index) that reports inside wins, per spec §4.H.
    fn sample(&mut self, local_range: f64, lat: f64, lon: f64) -> Result<Option<(usize, f64)>> {
        let mut found = None;
        for (i, entry) in self.entries.iter_mut().enumerate() {
            if let Some(z) = entry.sample(local_range, lat, lon)? {
                found = Some((i, z));
            }
        }
        Ok(found)
    }
}

/// `elevation`/`index` output shape: scalar for a single-layer stepper, a
/// `[below, above]` / `(layer, data)` pair once more than one layer is
/// configured (spec §4.H).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Elevation {
    Single(f64),
    Pair(f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataIndex {
    Single(i64),
    Pair(i64, i64),
}

/// The result of one [`Stepper::step`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub elevation: Elevation,
    pub step: f64,
    pub index: DataIndex,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    lat: f64,
    lon: f64,
    ground: f64,
    altitude: f64,
}

/// Layered ground geometry: flat planes, in-memory maps and cached tile
/// stacks, sampled through adaptive forward stepping (spec §4.H).
pub struct Stepper {
    layers: Vec<Layer>,
    geoid: Option<Map>,
    local_range: f64,
    slope_factor: f64,
    resolution_factor: f64,
    last_sample: Option<Sample>,
}

impl Default for Stepper {
    fn default() -> Stepper {
        Stepper {
            layers: Vec::new(),
            geoid: None,
            local_range: 1.0,
            slope_factor: 0.4,
            resolution_factor: 0.01,
            last_sample: None,
        }
    }
}

impl Stepper {
    pub fn new() -> Stepper {
        Stepper::default()
    }

    pub fn set_local_range(&mut self, metres: f64) {
        self.local_range = metres;
    }

    pub fn set_slope_factor(&mut self, factor: f64) {
        self.slope_factor = factor;
    }

    pub fn set_resolution_factor(&mut self, metres: f64) {
        self.resolution_factor = metres;
    }

    pub fn set_geoid(&mut self, geoid: Map) {
        self.geoid = Some(geoid);
    }

    /// Append a new, empty layer and return its index (layers are scanned
    /// in ascending-index order, so the first added has highest priority).
    pub fn add_layer(&mut self) -> usize {
        self.layers.push(Layer { entries: Vec::new() });
        self.layers.len() - 1
    }

    fn layer_mut(&mut self, layer: usize) -> Result<&mut Layer> {
        self.layers
            .get_mut(layer)
            .ok_or_else(|| raise!("Stepper::layer_mut", ErrorKind::DomainError, "layer {layer} out of range"))
    }

    pub fn add_flat(&mut self, layer: usize, offset: f64) -> Result<usize> {
        let l = self.layer_mut(layer)?;
        l.entries.push(DataEntry::flat(offset));
        Ok(l.entries.len() - 1)
    }

    pub fn add_map(&mut self, layer: usize, map: Map, offset: f64) -> Result<usize> {
        let l = self.layer_mut(layer)?;
        l.entries.push(DataEntry::map(map, offset));
        Ok(l.entries.len() - 1)
    }

    pub fn add_stack(&mut self, layer: usize, stack: Arc<Stack>, offset: f64) -> Result<usize> {
        let l = self.layer_mut(layer)?;
        l.entries.push(DataEntry::stack(stack, offset));
        Ok(l.entries.len() - 1)
    }

    /// Geoid undulation at `(lat, lon)`, or `0` with no geoid attached or
    /// outside its coverage.
    fn undulation(&self, lat: f64, lon: f64) -> f64 {
        match &self.geoid {
            // Per spec: `geoid.elevation(lon, lat)` directly, geographic axes only.
            Some(g) => {
                let (z, inside) = g.elevation_inside(lon, lat);
                if inside {
                    z
                } else {
                    0.0
                }
            }
            None => 0.0,
        }
    }

    /// Height above WGS84 adjusted into the geoid-relative frame that
    /// ground data is defined in. Spec §4.H fixes the correction's sign by
    /// the scenario in §8 S6, not by the (contradictory) prose in §9.
    fn adjusted_altitude(&self, lat: f64, lon: f64, h_wgs84: f64) -> f64 {
        h_wgs84 + self.undulation(lat, lon)
    }

    /// Inverse of [`Stepper::adjusted_altitude`]: recover a WGS84 height
    /// from a geoid-relative one.
    fn wgs84_height(&self, lat: f64, lon: f64, h_adjusted: f64) -> f64 {
        h_adjusted - self.undulation(lat, lon)
    }

    /// First layer (by ascending index) whose top entry is inside, along
    /// with that entry's index and ground elevation.
    fn locate(&mut self, lat: f64, lon: f64) -> Result<Option<(usize, usize, f64)>> {
        for (li, layer) in self.layers.iter_mut().enumerate() {
            if let Some((di, z)) = layer.sample(self.local_range, lat, lon)? {
                return Ok(Some((li, di, z)));
            }
        }
        Ok(None)
    }

    /// Nearest bounding ground elevations straddling `altitude`, across all
    /// layers that are inside at `(lat, lon)` (used for the multi-layer
    /// `[below, above]` output pair).
    fn elevation_bounds(&mut self, lat: f64, lon: f64, altitude: f64) -> Result<(f64, f64)> {
        let mut below = f64::NEG_INFINITY;
        let mut above = f64::INFINITY;
        for layer in self.layers.iter_mut() {
            if let Some((_, ground)) = layer.sample(self.local_range, lat, lon)? {
                if ground <= altitude && ground > below {
                    below = ground;
                }
                if ground > altitude && ground < above {
                    above = ground;
                }
            }
        }
        Ok((below, above))
    }

    /// For the named layer, find the top-most inside Data entry and return
    /// the ECEF point at `height` above its ground. `Ok(None)` when that
    /// layer has no inside entry at `(lat, lon)` (the idiomatic rendering of
    /// the C-style `index = -1, ecef untouched` sentinel).
    pub fn position(&mut self, lat: f64, lon: f64, height: f64, layer: usize) -> Result<Option<(Ecef, usize)>> {
        let l = self.layer_mut(layer)?;
        let Some((data_index, ground)) = l.sample(self.local_range, lat, lon)? else {
            return Ok(None);
        };
        let h_wgs84 = self.wgs84_height(lat, lon, ground + height);
        let ecef = ellipsoid::ecef_from_geodetic(Geodetic { lat, lon, h: h_wgs84 });
        Ok(Some((ecef, data_index)))
    }

    fn classify(&mut self, ecef: Ecef) -> Result<Option<ClassifyResult>> {
        let geodetic = ellipsoid::ecef_to_geodetic(ecef);
        let Some((layer, data, ground)) = self.locate(geodetic.lat, geodetic.lon)? else {
            return Ok(None);
        };
        let altitude = self.adjusted_altitude(geodetic.lat, geodetic.lon, geodetic.h);
        Ok(Some(ClassifyResult { lat: geodetic.lat, lon: geodetic.lon, layer, data, ground, altitude }))
    }

    fn output_of(&mut self, c: &ClassifyResult, step: f64) -> Result<StepResult> {
        let (elevation, index) = if self.layers.len() <= 1 {
            (Elevation::Single(c.ground), DataIndex::Single(c.data as i64))
        } else {
            let (below, above) = self.elevation_bounds(c.lat, c.lon, c.altitude)?;
            (Elevation::Pair(below, above), DataIndex::Pair(c.layer as i64, c.data as i64))
        };
        Ok(StepResult { latitude: c.lat, longitude: c.lon, altitude: c.altitude, elevation, step, index })
    }

    /// Sample mode (`direction = None`): classify `position` and report the
    /// adaptive step size `ds = max(resolution_factor, slope_factor *
    /// |altitude - ground|)` a caller should next advance by.
    ///
    /// Move mode (`direction = Some(..)`): tentatively advance `ds` along
    /// `direction`; if the before/after `inside` classification flips,
    /// locate the crossing by dichotomy (bracket `[-ds, 0]`, bisect to
    /// `1e-8` m) and commit a step that lands just past the boundary.
    pub fn step(&mut self, position: Ecef, direction: Option<Direction>) -> Result<StepResult> {
        let before = self
            .classify(position)?
            .ok_or_else(|| raise!("Stepper::step", ErrorKind::DomainError, "position outside all layer data"))?;
        let ds = (self.slope_factor * (before.altitude - before.ground).abs()).max(self.resolution_factor);

        let Some(dir) = direction else {
            self.last_sample = Some(Sample { lat: before.lat, lon: before.lon, ground: before.ground, altitude: before.altitude });
            return self.output_of(&before, ds);
        };

        let inside_before = before.altitude < before.ground;
        let tentative = advance(position, dir, ds);
        let after = self
            .classify(tentative)?
            .ok_or_else(|| raise!("Stepper::step", ErrorKind::DomainError, "position outside all layer data"))?;
        let inside_after = after.altitude < after.ground;

        if inside_before == inside_after {
            self.last_sample = Some(Sample { lat: after.lat, lon: after.lon, ground: after.ground, altitude: after.altitude });
            return self.output_of(&after, ds);
        }

        // Dichotomy: point(t) = tentative + t*dir, t in [-ds, 0]. t=-ds is
        // `position` (inside_before); t=0 is `tentative` (inside_after).
        let mut t0 = -ds;
        let mut t1 = 0.0;
        let classify_at = |stepper: &mut Stepper, t: f64| -> Result<bool> {
            let p = advance(tentative, dir, t);
            let c = stepper
                .classify(p)?
                .ok_or_else(|| raise!("Stepper::step", ErrorKind::DomainError, "dichotomy left all layer data"))?;
            Ok(c.altitude < c.ground)
        };
        let side0 = inside_before;
        while t1 - t0 > 1e-8 {
            let tm = 0.5 * (t0 + t1);
            if classify_at(self, tm)? == side0 {
                t0 = tm;
            } else {
                t1 = tm;
            }
        }

        let final_ds = ds + t1 + self.resolution_factor;
        let landed = advance(position, dir, final_ds);
        let committed = self
            .classify(landed)?
            .ok_or_else(|| raise!("Stepper::step", ErrorKind::DomainError, "position outside all layer data"))?;
        self.last_sample = Some(Sample { lat: committed.lat, lon: committed.lon, ground: committed.ground, altitude: committed.altitude });
        self.output_of(&committed, final_ds)
    }

    pub fn last_sample(&self) -> Option<(f64, f64, f64, f64)> {
        self.last_sample.map(|s| (s.lat, s.lon, s.ground, s.altitude))
    }
}

struct ClassifyResult {
    lat: f64,
    lon: f64,
    layer: usize,
    data: usize,
    ground: f64,
    altitude: f64,
}

fn advance(p: Ecef, dir: Direction, ds: f64) -> Ecef {
    Ecef::new(p.x + dir.x * ds, p.y + dir.y * ds, p.z + dir.z * ds)
}

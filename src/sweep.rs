//! The z-sweep engine: walks all declared z transitions in ascending order,
//! legalizes per-name regions against overlap priority, and accumulates the
//! horizontal and vertical boundary surfaces of the model.
//!
//! Orientation conventions, fixed across the whole crate:
//! - dielectric interface triangles face their `below` (outside) name;
//! - conductor surface triangles face away from the conductor;
//! - vertical wall triangles face the `left` (outside) name, which follows
//!   from walls being triangulated counter-clockwise in a local
//!   (distance-along-edge, z) frame whose edge direction keeps the owning
//!   region on the left.

use indexmap::IndexMap;
use tracing::{debug, error};

use crate::error::Result;
use crate::math::{Point2, Point3, Triangle3, Vector2};
use crate::region::{EdgeSet, GridEdge, Region};
use crate::triangulate::{triangulate, TriangulationParams};

/// Identifies a declared layer by class and name.
///
/// Conductors are processed before dielectrics at every z level; within a
/// class, declaration order decides boundary ownership.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum LayerKey {
    Conductor(String),
    Dielectric(String),
}

/// Key of a dielectric interface; `None` is the surrounding void.
///
/// Triangle normals face the `below` name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct DielKey {
    pub below: Option<String>,
    pub above: Option<String>,
}

/// Key of a conductor surface; normals face away from the conductor,
/// into `outside`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CondKey {
    pub net: String,
    pub outside: Option<String>,
}

/// Exact in-plane frame of a vertical wall.
///
/// The carrier line of a boundary edge, keyed by its gcd-reduced direction
/// and integer offset. Unlike [`crate::region::edgeset::LineKey`] the
/// direction keeps the edge's sign: anti-parallel edges on the same line
/// bound different walls with opposite normals. Keying on integers (rather
/// than a floating-point origin/direction pair) keeps wall identity stable
/// across platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct WallFrame {
    dir: (i64, i64),
    offset: i128,
}

impl WallFrame {
    fn from_edge(edge: &GridEdge) -> Self {
        let (dx, dy) = edge.delta();
        let g = crate::math::gcd(dx.abs(), dy.abs());
        let dir = (dx / g, dy / g);
        Self {
            dir,
            offset: dir.0 as i128 * edge.p1.1 as i128 - dir.1 as i128 * edge.p1.0 as i128,
        }
    }

    fn norm2(&self) -> f64 {
        (self.dir.0 as f64).mul_add(self.dir.0 as f64, (self.dir.1 as f64) * (self.dir.1 as f64))
    }

    /// Foot of the perpendicular from the coordinate origin onto the line.
    fn origin(&self) -> Point2 {
        let n2 = self.norm2();
        let c = self.offset as f64;
        Point2::new(-c * self.dir.1 as f64 / n2, c * self.dir.0 as f64 / n2)
    }

    /// Unit direction along the wall.
    fn direction(&self) -> Vector2 {
        let len = self.norm2().sqrt();
        Vector2::new(self.dir.0 as f64 / len, self.dir.1 as f64 / len)
    }

    /// Scalar position of a grid point along the wall, measured from
    /// [`Self::origin`].
    fn position(&self, p: (i64, i64)) -> f64 {
        let dot = self.dir.0 as i128 * p.0 as i128 + self.dir.1 as i128 * p.1 as i128;
        dot as f64 / self.norm2().sqrt()
    }

    /// Maps a local (distance, z-DBU) vertex back to physical space.
    fn to_physical(&self, x: f64, z: f64, dbu: f64) -> Point3 {
        let xy = self.origin() + self.direction() * x;
        Point3::new(xy.x * dbu, xy.y * dbu, z * dbu)
    }
}

/// The 3-D model generator: one instance owns the complete state of a
/// single generation pass.
///
/// Driven by [`crate::ModelBuilder::generate`]: `next_z` / `add_in` /
/// `add_out` / `finish_z` per z level in strictly ascending order, then
/// `finalize` exactly once. After that the surface tables are complete and
/// the instance can be checked and exported.
#[derive(Debug)]
pub struct ModelGenerator {
    pub(crate) dbu: f64,
    pub(crate) k_void: f64,
    params: TriangulationParams,
    pub(crate) materials: IndexMap<String, f64>,
    pub(crate) net_names: Vec<String>,

    /// Last processed z level, in DBU.
    z: Option<i64>,
    /// Start/end event regions per name, one entry per declaration.
    layers_in: IndexMap<LayerKey, Vec<Region>>,
    layers_out: IndexMap<LayerKey, Vec<Region>>,
    /// Legalized (visible) region per name.
    state: IndexMap<LayerKey, Region>,
    /// Nested coverage-count arenas per name: `pyramid[i]` is the area
    /// covered by more than `i` active declarations.
    pyramids: IndexMap<LayerKey, Vec<Region>>,

    pub(crate) diel_data: IndexMap<DielKey, Vec<Triangle3>>,
    pub(crate) cond_data: IndexMap<CondKey, Vec<Triangle3>>,
    diel_vdata: IndexMap<(Option<String>, Option<String>, WallFrame), Region>,
    cond_vdata: IndexMap<(String, Option<String>, WallFrame), Region>,
}

impl ModelGenerator {
    pub(crate) fn new(
        dbu: f64,
        k_void: f64,
        params: TriangulationParams,
        materials: IndexMap<String, f64>,
        net_names: Vec<String>,
    ) -> Self {
        Self {
            dbu,
            k_void,
            params,
            materials,
            net_names,
            z: None,
            layers_in: IndexMap::new(),
            layers_out: IndexMap::new(),
            state: IndexMap::new(),
            pyramids: IndexMap::new(),
            diel_data: IndexMap::new(),
            cond_data: IndexMap::new(),
            diel_vdata: IndexMap::new(),
            cond_vdata: IndexMap::new(),
        }
    }

    /// Total number of triangles over all surfaces.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.diel_data.values().map(Vec::len).sum::<usize>()
            + self.cond_data.values().map(Vec::len).sum::<usize>()
    }

    /// Dielectric interfaces as `(below, above, triangle count)`.
    pub fn dielectric_interfaces(&self) -> impl Iterator<Item = (Option<&str>, Option<&str>, usize)> {
        self.diel_data
            .iter()
            .map(|(k, v)| (k.below.as_deref(), k.above.as_deref(), v.len()))
    }

    /// Conductor surfaces as `(net, outside material, triangle count)`.
    pub fn conductor_surfaces(&self) -> impl Iterator<Item = (&str, Option<&str>, usize)> {
        self.cond_data
            .iter()
            .map(|(k, v)| (k.net.as_str(), k.outside.as_deref(), v.len()))
    }

    /// Consistently oriented hull triangles of a net body, in physical
    /// units.
    #[must_use]
    pub fn conductor_hull(&self, net: &str) -> Vec<Triangle3> {
        self.collect_conductor_tris(net)
    }

    /// Consistently oriented hull triangles of a material body, in physical
    /// units.
    #[must_use]
    pub fn dielectric_hull(&self, name: &str) -> Vec<Triangle3> {
        self.collect_dielectric_tris(name)
    }

    /// Advances the sweep to the next z level (DBU, strictly ascending).
    ///
    /// For every slab `[z_prev, z]` this emits the vertical boundary walls
    /// of the states legalized at `z_prev`.
    pub(crate) fn next_z(&mut self, z: i64) {
        debug!(z, "next z level");
        self.layers_in.clear();
        self.layers_out.clear();

        let Some(z_prev) = self.z else {
            self.z = Some(z);
            return;
        };

        // conductor boundaries always win against dielectric boundaries
        let mut all_cond = EdgeSet::new();
        for nn in &self.net_names {
            if let Some(state) = self.state.get(&LayerKey::Conductor(nn.clone())) {
                all_cond.extend(&state.edges());
            }
        }

        let material_names: Vec<String> = self.materials.keys().cloned().collect();
        for (i, mni) in material_names.iter().enumerate() {
            let Some(inside) = self.state.get(&LayerKey::Dielectric(mni.clone())) else {
                continue;
            };
            if inside.is_empty() {
                continue;
            }
            let mut linside = inside.edges().difference(&all_cond);
            for (o, mno) in material_names.iter().enumerate() {
                if o == i {
                    continue;
                }
                let Some(outside) = self.state.get(&LayerKey::Dielectric(mno.clone())) else {
                    continue;
                };
                if outside.is_empty() {
                    continue;
                }
                let loutside = outside.edges();
                if o > i {
                    // one wall per unordered pair: the earlier-registered
                    // material is the inside ("right") name
                    let shared: Vec<GridEdge> =
                        linside.shared_with(&loutside).iter().copied().collect();
                    for edge in shared {
                        self.emit_vertical_diel(Some(mno), Some(mni), &edge, z_prev, z);
                    }
                }
                linside = linside.difference(&loutside);
            }
            let rest: Vec<GridEdge> = linside.iter().copied().collect();
            for edge in rest {
                self.emit_vertical_diel(None, Some(mni), &edge, z_prev, z);
            }
        }

        let net_names = self.net_names.clone();
        for nn in &net_names {
            let Some(inside) = self.state.get(&LayerKey::Conductor(nn.clone())) else {
                continue;
            };
            if inside.is_empty() {
                continue;
            }
            let mut linside = inside.edges();
            for mno in &material_names {
                let Some(outside) = self.state.get(&LayerKey::Dielectric(mno.clone())) else {
                    continue;
                };
                if outside.is_empty() {
                    continue;
                }
                let loutside = outside.edges();
                let shared: Vec<GridEdge> = linside.shared_with(&loutside).iter().copied().collect();
                for edge in shared {
                    self.emit_vertical_cond(nn, Some(mno), &edge, z_prev, z);
                }
                linside = linside.difference(&loutside);
            }
            let rest: Vec<GridEdge> = linside.iter().copied().collect();
            for edge in rest {
                self.emit_vertical_cond(nn, None, &edge, z_prev, z);
            }
        }

        self.z = Some(z);
    }

    /// Records the start of one declaration's region at the current z.
    pub(crate) fn add_in(&mut self, key: LayerKey, region: &Region) {
        debug!(?key, "add in event");
        self.layers_in.entry(key).or_default().push(region.clone());
    }

    /// Records the end of one declaration's region at the current z.
    pub(crate) fn add_out(&mut self, key: LayerKey, region: &Region) {
        debug!(?key, "add out event");
        self.layers_out.entry(key).or_default().push(region.clone());
    }

    /// Legalizes the events recorded at the current z and emits the
    /// resulting horizontal interfaces.
    pub(crate) fn finish_z(&mut self) -> Result<()> {
        let Some(z) = self.z else {
            return Ok(());
        };
        debug!(z, "finishing z level");

        let mut acc = Deltas::default();

        let conductor_keys: Vec<LayerKey> = self
            .net_names
            .iter()
            .map(|n| LayerKey::Conductor(n.clone()))
            .collect();
        let dielectric_keys: Vec<LayerKey> = self
            .materials
            .keys()
            .map(|n| LayerKey::Dielectric(n.clone()))
            .collect();

        for key in &conductor_keys {
            self.legalize_events(key, &mut acc);
        }
        let all_cin = acc.all_in.clone();
        let all_cout = acc.all_out.clone();
        for key in &dielectric_keys {
            self.legalize_events(key, &mut acc);
        }

        self.check_state_overlap();

        let material_names: Vec<String> = self.materials.keys().cloned().collect();
        let net_names = self.net_names.clone();

        // dielectric bottoms: "in" deltas against "out" deltas and void
        for mni in &material_names {
            let Some(lin0) = acc.din.get(&LayerKey::Dielectric(mni.clone())) else {
                continue;
            };
            if lin0.is_empty() {
                continue;
            }
            let mut lin = lin0.clone();
            lin.subtract_with(&all_cout); // handled with the conductor
            for mno in &material_names {
                let Some(lout) = acc.dout.get(&LayerKey::Dielectric(mno.clone())) else {
                    continue;
                };
                if lout.is_empty() {
                    continue;
                }
                let d = lout.intersection(&lin);
                if !d.is_empty() {
                    self.emit_horizontal_diel(Some(mno.clone()), Some(mni.clone()), &d, z)?;
                }
                lin.subtract_with(lout);
            }
            if !lin.is_empty() {
                self.emit_horizontal_diel(None, Some(mni.clone()), &lin, z)?;
            }
        }

        // dielectric tops not covered by anything entering
        for mno in &material_names {
            let Some(lout0) = acc.dout.get(&LayerKey::Dielectric(mno.clone())) else {
                continue;
            };
            if lout0.is_empty() {
                continue;
            }
            let mut lout = lout0.clone();
            lout.subtract_with(&all_cin); // handled with the conductor
            for mni in &material_names {
                if let Some(lin) = acc.din.get(&LayerKey::Dielectric(mni.clone())) {
                    lout.subtract_with(lin);
                }
            }
            if !lout.is_empty() {
                self.emit_horizontal_diel(Some(mno.clone()), None, &lout, z)?;
            }
        }

        // conductor bottoms
        for nn in &net_names {
            let Some(lin0) = acc.din.get(&LayerKey::Conductor(nn.clone())) else {
                continue;
            };
            if lin0.is_empty() {
                continue;
            }
            let mut lin = lin0.clone();
            for mno in &material_names {
                let Some(lout) = acc.dout.get(&LayerKey::Dielectric(mno.clone())) else {
                    continue;
                };
                if lout.is_empty() {
                    continue;
                }
                let d = lout.intersection(&lin);
                if !d.is_empty() {
                    self.emit_horizontal_cond_in(nn, Some(mno.clone()), &d, z)?;
                }
                lin.subtract_with(lout);
            }
            if !lin.is_empty() {
                self.emit_horizontal_cond_in(nn, None, &lin, z)?;
            }
        }

        // conductor tops
        for nn in &net_names {
            let Some(lout0) = acc.dout.get(&LayerKey::Conductor(nn.clone())) else {
                continue;
            };
            if lout0.is_empty() {
                continue;
            }
            let mut lout = lout0.clone();
            lout.subtract_with(&all_cin); // handled with the conductor
            for mni in &material_names {
                let Some(lin) = acc.din.get(&LayerKey::Dielectric(mni.clone())) else {
                    continue;
                };
                if lin.is_empty() {
                    continue;
                }
                let d = lout.intersection(lin);
                if !d.is_empty() {
                    self.emit_horizontal_cond_out(nn, Some(mni.clone()), &d, z)?;
                }
                lout.subtract_with(lin);
            }
            if !lout.is_empty() {
                self.emit_horizontal_cond_out(nn, None, &lout, z)?;
            }
        }

        Ok(())
    }

    /// Merges one name's events into its pyramid and legalizes the level-0
    /// deltas against the names already processed at this z.
    fn legalize_events(&mut self, key: &LayerKey, acc: &mut Deltas) {
        let pyramid = self.pyramids.entry(key.clone()).or_default();
        let current_before = pyramid.first().cloned().unwrap_or_default();
        let ins = self.layers_in.get(key).cloned().unwrap_or_default();
        let outs = self.layers_out.get(key).cloned().unwrap_or_default();

        let (lin_raw, lout_raw, current) = merge_events(pyramid, &ins, &outs);
        debug!(?key, "merged events");

        let state = self.state.entry(key.clone()).or_default();

        let mut lin = lin_raw.difference(&acc.all);
        let mut lout = lout_raw.intersection(state);
        lout.union_with(&current.intersection(&acc.all_in));
        lin.union_with(&current_before.intersection(&acc.all_out));
        lin.subtract_with(&lout_raw);
        lout.subtract_with(&lin_raw);

        state.union_with(&lin);
        state.subtract_with(&lout);

        acc.all.union_with(state);
        acc.all_in.union_with(&lin);
        acc.all_out.union_with(&lout);
        acc.din.insert(key.clone(), lin);
        acc.dout.insert(key.clone(), lout);
    }

    /// Non-fatal invariant check: legalized states must be pairwise
    /// disjoint. A violation means two names overlap at equal priority;
    /// it is reported and the sweep continues.
    fn check_state_overlap(&self) {
        let mut rest = Region::new();
        for state in self.state.values() {
            rest.union_with(state);
        }
        for (key, state) in &self.state {
            let outside = state.difference(&rest);
            if !outside.is_empty() {
                error!(
                    ?key,
                    area = outside.area(),
                    "state region overlaps another name at the same priority"
                );
            }
            rest.subtract_with(state);
        }
    }

    fn emit_horizontal_diel(
        &mut self,
        below: Option<String>,
        above: Option<String>,
        region: &Region,
        z: i64,
    ) -> Result<()> {
        debug!(?below, ?above, z, "horizontal dielectric interface");
        let triangles = triangulate(region, &self.params)?;
        let dbu = self.dbu;
        let data = self.diel_data.entry(DielKey { below, above }).or_default();
        for t in &triangles {
            // normal faces downwards, to "below"
            data.push(tri_at_z(t, z, dbu, Winding::Down));
        }
        Ok(())
    }

    fn emit_horizontal_cond_in(
        &mut self,
        net: &str,
        below: Option<String>,
        region: &Region,
        z: i64,
    ) -> Result<()> {
        debug!(net, ?below, z, "horizontal bottom conductor surface");
        let triangles = triangulate(region, &self.params)?;
        let dbu = self.dbu;
        let data = self
            .cond_data
            .entry(CondKey {
                net: net.to_owned(),
                outside: below,
            })
            .or_default();
        for t in &triangles {
            // normal faces downwards, out of the conductor
            data.push(tri_at_z(t, z, dbu, Winding::Down));
        }
        Ok(())
    }

    fn emit_horizontal_cond_out(
        &mut self,
        net: &str,
        above: Option<String>,
        region: &Region,
        z: i64,
    ) -> Result<()> {
        debug!(net, ?above, z, "horizontal top conductor surface");
        let triangles = triangulate(region, &self.params)?;
        let dbu = self.dbu;
        let data = self
            .cond_data
            .entry(CondKey {
                net: net.to_owned(),
                outside: above,
            })
            .or_default();
        for t in &triangles {
            // normal faces upwards, out of the conductor
            data.push(tri_at_z(t, z, dbu, Winding::Up));
        }
        Ok(())
    }

    fn emit_vertical_diel(
        &mut self,
        left: Option<&str>,
        right: Option<&str>,
        edge: &GridEdge,
        z1: i64,
        z2: i64,
    ) {
        if edge.is_degenerate() {
            return;
        }
        debug!(?left, ?right, ?edge, "vertical dielectric wall segment");
        let frame = WallFrame::from_edge(edge);
        let x1 = frame.position(edge.p1);
        let x2 = frame.position(edge.p2);
        self.diel_vdata
            .entry((left.map(str::to_owned), right.map(str::to_owned), frame))
            .or_default()
            .insert_box(x1, z1 as f64, x2, z2 as f64);
    }

    fn emit_vertical_cond(&mut self, net: &str, left: Option<&str>, edge: &GridEdge, z1: i64, z2: i64) {
        if edge.is_degenerate() {
            return;
        }
        debug!(net, ?left, ?edge, "vertical conductor wall segment");
        let frame = WallFrame::from_edge(edge);
        let x1 = frame.position(edge.p1);
        let x2 = frame.position(edge.p2);
        self.cond_vdata
            .entry((net.to_owned(), left.map(str::to_owned), frame))
            .or_default()
            .insert_box(x1, z1 as f64, x2, z2 as f64);
    }

    /// Triangulates the accumulated vertical walls and folds mirrored
    /// dielectric surface pairs, so every physical interface is represented
    /// exactly once.
    pub(crate) fn finalize(&mut self) -> Result<()> {
        let diel_walls = std::mem::take(&mut self.diel_vdata);
        for ((left, right, frame), region) in diel_walls {
            debug!(?left, ?right, "finishing vertical dielectric wall");
            let triangles = triangulate(&region, &self.params)?;
            let dbu = self.dbu;
            let data = self
                .diel_data
                .entry(DielKey {
                    below: left,
                    above: right,
                })
                .or_default();
            for t in &triangles {
                // normal faces outwards, to "left"
                data.push(wall_tri(&frame, t, dbu));
            }
        }

        let cond_walls = std::mem::take(&mut self.cond_vdata);
        for ((net, left, frame), region) in cond_walls {
            debug!(net, ?left, "finishing vertical conductor wall");
            let triangles = triangulate(&region, &self.params)?;
            let dbu = self.dbu;
            let data = self
                .cond_data
                .entry(CondKey { net, outside: left })
                .or_default();
            for t in &triangles {
                data.push(wall_tri(&frame, t, dbu));
            }
        }

        // collapse mirrored dielectric pairs: (B, A) folds into (A, B)
        let data = std::mem::take(&mut self.diel_data);
        let mut merged: IndexMap<DielKey, Vec<Triangle3>> = IndexMap::new();
        for key in data.keys() {
            let mirrored = DielKey {
                below: key.above.clone(),
                above: key.below.clone(),
            };
            if merged.contains_key(&mirrored) {
                debug!(?key, "combining mirrored dielectric surfaces");
            } else {
                merged.insert(key.clone(), Vec::new());
            }
        }
        for (key, triangles) in data {
            let mirrored = DielKey {
                below: key.above.clone(),
                above: key.below.clone(),
            };
            if key != mirrored && merged.contains_key(&mirrored) {
                if let Some(slot) = merged.get_mut(&mirrored) {
                    slot.extend(triangles.iter().map(|t| [t[2], t[1], t[0]]));
                }
            } else if let Some(slot) = merged.get_mut(&key) {
                slot.extend(triangles);
            }
        }
        self.diel_data = merged;

        Ok(())
    }
}

/// Per-z legalization accumulators.
#[derive(Default)]
struct Deltas {
    din: IndexMap<LayerKey, Region>,
    dout: IndexMap<LayerKey, Region>,
    /// Union of all states legalized so far at this z.
    all: Region,
    all_in: Region,
    all_out: Region,
}

enum Winding {
    Up,
    Down,
}

fn tri_at_z(t: &[Point2; 3], z: i64, dbu: f64, winding: Winding) -> Triangle3 {
    let p = |i: usize| Point3::new(t[i].x * dbu, t[i].y * dbu, z as f64 * dbu);
    match winding {
        // CCW source triangles have an upward normal
        Winding::Up => [p(0), p(1), p(2)],
        Winding::Down => [p(2), p(1), p(0)],
    }
}

fn wall_tri(frame: &WallFrame, t: &[Point2; 3], dbu: f64) -> Triangle3 {
    [
        frame.to_physical(t[0].x, t[0].y, dbu),
        frame.to_physical(t[1].x, t[1].y, dbu),
        frame.to_physical(t[2].x, t[2].y, dbu),
    ]
}

/// Applies one z level's events to a name's pyramid arena.
///
/// Each incoming declaration region fills the lowest level not already
/// covering it, pushing overlap one level deeper (the arena grows by at most
/// one level per event). Each ending declaration region is removed
/// deepest-level-first, decrementing the coverage count by exactly one.
/// Returns the net level-0 `(in, out, current)` change.
fn merge_events(pyramid: &mut Vec<Region>, ins: &[Region], outs: &[Region]) -> (Region, Region, Region) {
    let past = pyramid.first().cloned().unwrap_or_default();

    for event in ins {
        let mut lin = event.clone();
        let depth = pyramid.len();
        for ii in (1..=depth).rev() {
            let added = lin.intersection(&pyramid[ii - 1]);
            if !added.is_empty() {
                if ii == pyramid.len() {
                    pyramid.push(Region::new());
                }
                pyramid[ii].union_with(&added);
                lin.subtract_with(&added);
            }
        }
        if pyramid.is_empty() {
            pyramid.push(Region::new());
        }
        pyramid[0].union_with(&lin);
    }

    for event in outs {
        let mut lout = event.clone();
        for ii in (1..=pyramid.len()).rev() {
            let removed = lout.intersection(&pyramid[ii - 1]);
            if !removed.is_empty() {
                pyramid[ii - 1].subtract_with(&removed);
                lout.subtract_with(&removed);
            }
        }
    }

    let level0 = pyramid.first().cloned().unwrap_or_default();
    (level0.difference(&past), past.difference(&level0), level0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn rect(x1: i64, y1: i64, x2: i64, y2: i64) -> Region {
        Region::from_rect(x1, y1, x2, y2)
    }

    #[test]
    fn merge_events_tracks_overlap_depth() {
        let mut pyramid = Vec::new();
        let (lin, lout, current) = merge_events(&mut pyramid, &[rect(0, 0, 10, 10)], &[]);
        assert!((lin.area() - 100.0).abs() < 1e-9);
        assert!(lout.is_empty());
        assert!((current.area() - 100.0).abs() < 1e-9);

        // a second overlapping declaration deepens the pyramid, level 0
        // grows only by the uncovered part
        let (lin, lout, _) = merge_events(&mut pyramid, &[rect(5, 0, 15, 10)], &[]);
        assert!((lin.area() - 50.0).abs() < 1e-9);
        assert!(lout.is_empty());
        assert_eq!(pyramid.len(), 2);
        assert!((pyramid[1].area() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn merge_events_removal_decrements_one_level() {
        let mut pyramid = Vec::new();
        merge_events(&mut pyramid, &[rect(0, 0, 10, 10)], &[]);
        merge_events(&mut pyramid, &[rect(0, 0, 10, 10)], &[]);
        assert_eq!(pyramid.len(), 2);

        // first ending only peels the deeper level, the area stays visible
        let (lin, lout, current) = merge_events(&mut pyramid, &[], &[rect(0, 0, 10, 10)]);
        assert!(lin.is_empty());
        assert!(lout.is_empty());
        assert!((current.area() - 100.0).abs() < 1e-9);

        // second ending clears level 0
        let (_, lout, current) = merge_events(&mut pyramid, &[], &[rect(0, 0, 10, 10)]);
        assert!((lout.area() - 100.0).abs() < 1e-9);
        assert!(current.is_empty());
    }

    #[test]
    fn merge_events_simultaneous_start_and_end_is_silent() {
        let mut pyramid = Vec::new();
        merge_events(&mut pyramid, &[rect(0, 0, 10, 10)], &[]);
        // same area ends and restarts at one z: no net level-0 delta
        let (lin, lout, current) =
            merge_events(&mut pyramid, &[rect(0, 0, 10, 10)], &[rect(0, 0, 10, 10)]);
        assert!(lin.is_empty());
        assert!(lout.is_empty());
        assert!((current.area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn wall_frame_is_shared_by_collinear_same_direction_edges() {
        let a = GridEdge {
            p1: (0, 10),
            p2: (5, 10),
        };
        let b = GridEdge {
            p1: (5, 10),
            p2: (9, 10),
        };
        assert_eq!(WallFrame::from_edge(&a), WallFrame::from_edge(&b));

        let reversed = GridEdge {
            p1: (9, 10),
            p2: (5, 10),
        };
        assert_ne!(WallFrame::from_edge(&a), WallFrame::from_edge(&reversed));
    }

    #[test]
    fn wall_frame_round_trips_grid_points() {
        let edge = GridEdge {
            p1: (10, 10),
            p2: (0, 10),
        };
        let frame = WallFrame::from_edge(&edge);
        let x1 = frame.position(edge.p1);
        let p = frame.to_physical(x1, 7.0, 1.0);
        assert!((p.x - 10.0).abs() < 1e-9);
        assert!((p.y - 10.0).abs() < 1e-9);
        assert!((p.z - 7.0).abs() < 1e-9);
    }

    #[test]
    fn wall_frame_positions_are_ordered_along_edge() {
        let edge = GridEdge {
            p1: (3, 4),
            p2: (6, 8),
        };
        let frame = WallFrame::from_edge(&edge);
        assert!(frame.position(edge.p1) < frame.position(edge.p2));
    }
}

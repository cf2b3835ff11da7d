//! Manifold closure check for the generated surface model.
//!
//! Collects the oriented triangle hull of every material and net body,
//! quantizes the vertices back onto the DBU grid and verifies that every
//! directed edge is matched by its reverse. T-junctions between surfaces
//! triangulated at different granularity are resolved by splitting longer
//! edges at the endpoints of shorter collinear anti-parallel ones before
//! matching.

use std::collections::{HashMap, HashSet};

use tracing::{error, info};

use crate::math::{snap, Point3, Triangle3};
use crate::sweep::ModelGenerator;

type GridPoint = (i64, i64, i64);
type DirEdge = (GridPoint, GridPoint);

/// Upper bound on edge-splitting passes; each pass only shortens edges, so
/// non-convergence indicates corrupt input rather than a deep mesh.
const MAX_SPLIT_ROUNDS: usize = 64;

impl ModelGenerator {
    /// Verifies that every material and net body is a closed oriented
    /// surface, and returns the number of violations found.
    ///
    /// Violations are reported through the log and do not abort: a locally
    /// open hull degrades solver accuracy but the model may still be usable.
    #[must_use]
    pub fn check(&self) -> usize {
        info!("checking surface closure");
        let mut errors = 0;
        for name in self.materials.keys() {
            let triangles = self.collect_dielectric_tris(name);
            info!(material = %name, triangles = triangles.len(), "checking material hull");
            errors += check_hull(&format!("material '{name}'"), &triangles, self.dbu);
        }
        for net in &self.net_names {
            let triangles = self.collect_conductor_tris(net);
            info!(net = %net, triangles = triangles.len(), "checking conductor hull");
            errors += check_hull(&format!("net '{net}'"), &triangles, self.dbu);
        }
        if errors == 0 {
            info!("surface closure check passed");
        } else {
            error!(errors, "surface closure check failed");
        }
        errors
    }

    /// All triangles bounding the body of dielectric `name`, consistently
    /// oriented.
    pub(crate) fn collect_dielectric_tris(&self, name: &str) -> Vec<Triangle3> {
        let mut triangles = Vec::new();
        for (key, data) in &self.diel_data {
            if key.below.as_deref() == Some(name) {
                triangles.extend_from_slice(data);
            } else if key.above.as_deref() == Some(name) {
                triangles.extend(data.iter().map(reversed));
            }
        }
        for (key, data) in &self.cond_data {
            // conductor surfaces face their outside dielectric
            if key.outside.as_deref() == Some(name) {
                triangles.extend_from_slice(data);
            }
        }
        triangles
    }

    /// All triangles bounding the body of net `net`, consistently oriented.
    pub(crate) fn collect_conductor_tris(&self, net: &str) -> Vec<Triangle3> {
        self.cond_data
            .iter()
            .filter(|(key, _)| key.net == net)
            .flat_map(|(_, data)| data.iter().map(reversed))
            .collect()
    }
}

fn reversed(t: &Triangle3) -> Triangle3 {
    [t[2], t[1], t[0]]
}

fn quantize(p: &Point3, dbu: f64) -> GridPoint {
    (snap(p.x / dbu), snap(p.y / dbu), snap(p.z / dbu))
}

fn check_hull(label: &str, triangles: &[Triangle3], dbu: f64) -> usize {
    let mut errors = 0;
    let mut edges: HashSet<DirEdge> = HashSet::new();

    for t in triangles {
        let corners = [
            quantize(&t[0], dbu),
            quantize(&t[1], dbu),
            quantize(&t[2], dbu),
        ];
        for i in 0..3 {
            let edge = (corners[i], corners[(i + 1) % 3]);
            if edge.0 == edge.1 {
                continue;
            }
            if !edges.insert(edge) {
                error!(%label, ?edge, "duplicate directed edge");
                errors += 1;
            }
        }
    }

    if !split_edges(&mut edges) {
        error!(%label, rounds = MAX_SPLIT_ROUNDS, "edge splitting did not converge");
        errors += 1;
    }

    for edge in &edges {
        if !edges.contains(&(edge.1, edge.0)) {
            error!(%label, ?edge, "unmatched directed edge (open surface)");
            errors += 1;
        }
    }

    errors
}

fn direction(edge: &DirEdge) -> (i64, i64, i64) {
    (
        edge.1 .0 - edge.0 .0,
        edge.1 .1 - edge.0 .1,
        edge.1 .2 - edge.0 .2,
    )
}

fn sq_len(v: (i64, i64, i64)) -> i128 {
    let (x, y, z) = (v.0 as i128, v.1 as i128, v.2 as i128);
    x * x + y * y + z * z
}

/// True if `a` and `b` are collinear and point in opposite directions.
fn is_antiparallel(a: (i64, i64, i64), b: (i64, i64, i64)) -> bool {
    let (ax, ay, az) = (a.0 as i128, a.1 as i128, a.2 as i128);
    let (bx, by, bz) = (b.0 as i128, b.1 as i128, b.2 as i128);
    let cross = (
        ay * bz - az * by,
        az * bx - ax * bz,
        ax * by - ay * bx,
    );
    cross == (0, 0, 0) && ax * bx + ay * by + az * bz < 0
}

/// Splits edges at T-junctions until every splittable edge is gone.
///
/// An edge is split where a strictly shorter anti-parallel collinear edge
/// shares one of its endpoints; both resulting pieces re-enter the set.
/// Returns false if the fixed point is not reached within
/// [`MAX_SPLIT_ROUNDS`].
fn split_edges(edges: &mut HashSet<DirEdge>) -> bool {
    for _ in 0..MAX_SPLIT_ROUNDS {
        let mut by_start: HashMap<GridPoint, Vec<DirEdge>> = HashMap::new();
        let mut by_end: HashMap<GridPoint, Vec<DirEdge>> = HashMap::new();
        for edge in edges.iter() {
            by_start.entry(edge.0).or_default().push(*edge);
            by_end.entry(edge.1).or_default().push(*edge);
        }

        let mut splits: HashMap<DirEdge, Vec<(DirEdge, DirEdge)>> = HashMap::new();
        for edge in edges.iter() {
            let dir = direction(edge);
            let len2 = sq_len(dir);

            // shorter anti-parallel edge ending at our start point
            if let Some(candidates) = by_end.get(&edge.0) {
                for cand in candidates {
                    let cdir = direction(cand);
                    if is_antiparallel(dir, cdir) && sq_len(cdir) < len2 {
                        splits
                            .entry(*edge)
                            .or_default()
                            .push(((edge.0, cand.0), (cand.0, edge.1)));
                    }
                }
            }
            // shorter anti-parallel edge starting at our end point
            if let Some(candidates) = by_start.get(&edge.1) {
                for cand in candidates {
                    let cdir = direction(cand);
                    if is_antiparallel(dir, cdir) && sq_len(cdir) < len2 {
                        splits
                            .entry(*edge)
                            .or_default()
                            .push(((edge.0, cand.1), (cand.1, edge.1)));
                    }
                }
            }
        }

        if splits.is_empty() {
            return true;
        }
        for (edge, pieces) in splits {
            edges.remove(&edge);
            for (a, b) in pieces {
                if a.0 != a.1 {
                    edges.insert(a);
                }
                if b.0 != b.1 {
                    edges.insert(b);
                }
            }
        }
    }
    false
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn e(a: GridPoint, b: GridPoint) -> DirEdge {
        (a, b)
    }

    #[test]
    fn matched_edges_need_no_split() {
        let mut edges: HashSet<DirEdge> = HashSet::new();
        edges.insert(e((0, 0, 0), (10, 0, 0)));
        edges.insert(e((10, 0, 0), (0, 0, 0)));
        assert!(split_edges(&mut edges));
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn t_junction_edge_is_split_at_neighbor_endpoint() {
        // one long edge against two short reverse edges covering it
        let mut edges: HashSet<DirEdge> = HashSet::new();
        edges.insert(e((0, 0, 0), (10, 0, 0)));
        edges.insert(e((10, 0, 0), (4, 0, 0)));
        edges.insert(e((4, 0, 0), (0, 0, 0)));
        assert!(split_edges(&mut edges));
        assert!(edges.contains(&e((0, 0, 0), (4, 0, 0))));
        assert!(edges.contains(&e((4, 0, 0), (10, 0, 0))));
        for edge in &edges {
            assert!(edges.contains(&(edge.1, edge.0)));
        }
    }

    #[test]
    fn nested_junctions_split_to_fixed_point() {
        // long edge vs three reverse pieces, split cascades over rounds
        let mut edges: HashSet<DirEdge> = HashSet::new();
        edges.insert(e((0, 0, 0), (9, 0, 0)));
        edges.insert(e((9, 0, 0), (6, 0, 0)));
        edges.insert(e((6, 0, 0), (2, 0, 0)));
        edges.insert(e((2, 0, 0), (0, 0, 0)));
        assert!(split_edges(&mut edges));
        for edge in &edges {
            assert!(
                edges.contains(&(edge.1, edge.0)),
                "unmatched {edge:?} after splitting"
            );
        }
    }

    #[test]
    fn antiparallel_requires_collinearity() {
        assert!(is_antiparallel((4, 0, 0), (-2, 0, 0)));
        assert!(!is_antiparallel((4, 0, 0), (4, 0, 0)));
        assert!(!is_antiparallel((4, 0, 0), (-2, 1, 0)));
        assert!(!is_antiparallel((0, 3, 3), (0, 3, -3)));
        assert!(is_antiparallel((0, 3, 3), (0, -1, -1)));
    }
}

use std::collections::{HashMap, HashSet, VecDeque};

use spade::handles::FixedFaceHandle;
use spade::{
    AngleLimit, ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2,
    RefinementParameters, Triangulation,
};

use crate::error::{Result, TriangulationError};
use crate::math::Point2;
use crate::region::Region;

/// Parameters for the constrained Delaunay triangulation of surfaces.
///
/// `b` corresponds to the minimum interior angle and should be `<= 1`
/// (`b = 2 * sin(min_angle)`): `b = 1` gives 30°, `b = 0.5` about 14.5°.
/// `max_area` bounds the triangle area in DBU²; `0` means unbounded.
#[derive(Debug, Clone, Copy)]
pub struct TriangulationParams {
    /// Maximum triangle area in DBU² (`<= 0` disables the bound).
    pub max_area: f64,
    /// Minimum-angle ratio, `b = 2 * sin(min_angle)`, clamped to `[0, 1]`.
    pub b: f64,
}

impl Default for TriangulationParams {
    fn default() -> Self {
        Self {
            max_area: 0.0,
            b: 1.0,
        }
    }
}

/// Triangulates a region into CCW triangles in DBU coordinates.
///
/// Every ring of every polygon becomes a constraint loop; the mesh is
/// refined per `params`, and only faces inside the polygon set (odd
/// constraint-crossing parity from the outside) are returned.
///
/// # Errors
///
/// Returns [`TriangulationError`] if a constraint loop is malformed or a
/// vertex cannot be inserted; such failures indicate an invalid upstream
/// declaration and abort the generation pass.
pub fn triangulate(region: &Region, params: &TriangulationParams) -> Result<Vec<[Point2; 3]>> {
    if region.is_empty() {
        return Ok(Vec::new());
    }

    let mut cdt = ConstrainedDelaunayTriangulation::<SpadePoint2<f64>>::new();
    let polygons = region.polygons();
    for polygon in &polygons {
        insert_constraint_loop(&mut cdt, polygon.exterior().0.as_slice())?;
        for hole in polygon.interiors() {
            insert_constraint_loop(&mut cdt, hole.0.as_slice())?;
        }
    }

    let b = params.b.clamp(0.0, 1.0);
    if b > 0.0 || params.max_area > 0.0 {
        // Refinement may split constraint edges, so surfaces sharing a
        // boundary can disagree on its subdivision; the manifold checker's
        // edge-splitting pass reconciles that.
        // Outer faces (even constraint-crossing parity) are discarded below,
        // so their shape must not drive subdivision of boundary edges.
        let mut refinement = RefinementParameters::<f64>::default()
            .exclude_outer_faces(true)
            .with_angle_limit(AngleLimit::from_deg((b / 2.0).asin().to_degrees()));
        if params.max_area > 0.0 {
            refinement = refinement.with_max_allowed_area(params.max_area);
        }
        cdt.refine(refinement);
    }

    let interior_faces = classify_interior_faces(&cdt);

    let mut triangles = Vec::new();
    for face_handle in cdt.inner_faces() {
        if !interior_faces.contains(&face_handle.fix().index()) {
            continue;
        }
        let verts = face_handle.vertices();
        let mut tri = [Point2::origin(); 3];
        for (corner, vh) in tri.iter_mut().zip(verts.iter()) {
            let pos = vh.position();
            *corner = Point2::new(pos.x, pos.y);
        }
        triangles.push(tri);
    }

    Ok(triangles)
}

/// Inserts a closed ring as constraint edges into the CDT.
///
/// The ring may or may not repeat its first point at the end.
fn insert_constraint_loop(
    cdt: &mut ConstrainedDelaunayTriangulation<SpadePoint2<f64>>,
    ring: &[geo::Coord<f64>],
) -> Result<()> {
    let mut points: Vec<SpadePoint2<f64>> =
        ring.iter().map(|c| SpadePoint2::new(c.x, c.y)).collect();
    if points.len() >= 2 && points.first() == points.last() {
        points.pop();
    }
    if points.len() < 3 {
        return Err(TriangulationError::ShortConstraintLoop(points.len()).into());
    }

    let mut handles = Vec::with_capacity(points.len());
    for &pt in &points {
        let h = cdt
            .insert(pt)
            .map_err(|e: InsertionError| TriangulationError::Failed(format!("CDT insert: {e}")))?;
        handles.push(h);
    }

    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if from != to {
            cdt.add_constraint(from, to);
        }
    }

    Ok(())
}

/// Classifies which inner faces of the CDT are inside the polygon set.
///
/// Flood-fill from faces adjacent to the outer (infinite) face at depth 0;
/// crossing a constraint edge increments the depth. Odd depth = interior.
fn classify_interior_faces(
    cdt: &ConstrainedDelaunayTriangulation<SpadePoint2<f64>>,
) -> HashSet<usize> {
    let mut interior = HashSet::new();
    let mut depth_map: HashMap<usize, u32> = HashMap::new();
    let mut queue: VecDeque<(FixedFaceHandle<spade::handles::InnerTag>, u32)> = VecDeque::new();

    let outer_fix = cdt.outer_face().fix();

    // Seed: inner faces adjacent to the outer face via directed edges
    for edge in cdt.directed_edges() {
        if edge.face().fix() == outer_fix {
            let rev_face = edge.rev().face();
            if let Some(inner) = rev_face.as_inner() {
                let idx = inner.fix().index();
                if depth_map.contains_key(&idx) {
                    continue;
                }
                let depth = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
                depth_map.insert(idx, depth);
                if depth % 2 == 1 {
                    interior.insert(idx);
                }
                queue.push_back((inner.fix(), depth));
            }
        }
    }

    // BFS flood-fill
    while let Some((face_fix, depth)) = queue.pop_front() {
        let face = cdt.face(face_fix);
        for edge in face.adjacent_edges() {
            let neighbor = edge.rev().face();
            if let Some(inner_neighbor) = neighbor.as_inner() {
                let n_idx = inner_neighbor.fix().index();
                if depth_map.contains_key(&n_idx) {
                    continue;
                }
                let new_depth = if cdt.is_constraint_edge(edge.as_undirected().fix()) {
                    depth + 1
                } else {
                    depth
                };
                depth_map.insert(n_idx, new_depth);
                if new_depth % 2 == 1 {
                    interior.insert(n_idx);
                }
                queue.push_back((inner_neighbor.fix(), new_depth));
            }
        }
    }

    interior
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn signed_area(tri: &[Point2; 3]) -> f64 {
        0.5 * ((tri[1].x - tri[0].x) * (tri[2].y - tri[0].y)
            - (tri[2].x - tri[0].x) * (tri[1].y - tri[0].y))
    }

    fn total_area(tris: &[[Point2; 3]]) -> f64 {
        tris.iter().map(signed_area).sum()
    }

    #[test]
    fn empty_region_yields_no_triangles() {
        let tris = triangulate(&Region::new(), &TriangulationParams::default()).unwrap();
        assert!(tris.is_empty());
    }

    #[test]
    fn square_produces_2_ccw_triangles() {
        let region = Region::from_rect(0, 0, 100, 100);
        let tris = triangulate(&region, &TriangulationParams::default()).unwrap();
        assert_eq!(tris.len(), 2);
        for tri in &tris {
            assert!(signed_area(tri) > 0.0, "triangles must be CCW");
        }
        assert!((total_area(&tris) - 10_000.0).abs() < 1e-6);
    }

    #[test]
    fn l_shape_concave_triangulates() {
        let region = Region::from_points(&[(0, 0), (40, 0), (40, 20), (20, 20), (20, 40), (0, 40)]);
        // refinement off: the corner triangles undercut a 30 degree angle
        // and would otherwise be subdivided
        let params = TriangulationParams {
            max_area: 0.0,
            b: 0.0,
        };
        let tris = triangulate(&region, &params).unwrap();
        assert_eq!(tris.len(), 4);
        assert!((total_area(&tris) - 1200.0).abs() < 1e-6);
    }

    #[test]
    fn hole_is_excluded() {
        let region =
            Region::from_rect(0, 0, 100, 100).difference(&Region::from_rect(30, 30, 70, 70));
        let tris = triangulate(&region, &TriangulationParams::default()).unwrap();
        assert!((total_area(&tris) - (10_000.0 - 1600.0)).abs() < 1e-6);
        for tri in &tris {
            let cx = (tri[0].x + tri[1].x + tri[2].x) / 3.0;
            let cy = (tri[0].y + tri[1].y + tri[2].y) / 3.0;
            let in_hole = cx > 30.0 && cx < 70.0 && cy > 30.0 && cy < 70.0;
            assert!(!in_hole, "triangle centroid ({cx}, {cy}) is inside the hole");
        }
    }

    #[test]
    fn max_area_refines_mesh() {
        let region = Region::from_rect(0, 0, 100, 100);
        let params = TriangulationParams {
            max_area: 500.0,
            b: 1.0,
        };
        let tris = triangulate(&region, &params).unwrap();
        assert!(tris.len() > 2, "expected refinement, got {}", tris.len());
        assert!((total_area(&tris) - 10_000.0).abs() < 1e-6);
    }

    #[test]
    fn area_bound_refines_boundary_dominated_rect() {
        // all initial triangle edges lie on constraints here; the area
        // bound must still take effect
        let region = Region::from_rect(0, 0, 2000, 1000);
        let params = TriangulationParams {
            max_area: 50_000.0,
            b: 0.5,
        };
        let tris = triangulate(&region, &params).unwrap();
        assert!(tris.len() > 2, "no refinement happened: {}", tris.len());
        assert!(tris
            .iter()
            .all(|t| signed_area(t) <= 50_000.0 + 1e-6));
        assert!((total_area(&tris) - 2_000_000.0).abs() < 1e-6);
    }

    #[test]
    fn disjoint_polygons_triangulate_independently() {
        let mut region = Region::from_rect(0, 0, 10, 10);
        region.union_with(&Region::from_rect(50, 0, 60, 10));
        let tris = triangulate(&region, &TriangulationParams::default()).unwrap();
        assert_eq!(tris.len(), 4);
    }
}

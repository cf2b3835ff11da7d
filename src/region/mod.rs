pub mod edgeset;

pub use edgeset::{EdgeSet, GridEdge};

use geo::algorithm::orient::{Direction, Orient};
use geo::{coord, Area, BooleanOps, Coord, LineString, MultiPolygon, Polygon, Rect};

use crate::error::{GeometryError, Result};
use crate::math::snap;

/// A 2-D polygon set in integer database units.
///
/// Thin wrapper over [`geo::MultiPolygon`] providing the boolean operations
/// the sweep engine needs. Coordinates are integer DBU values stored as f64;
/// boolean results are kept as-is and only re-quantized where exact identity
/// matters (directed-edge extraction, wall-plane keys).
#[derive(Debug, Clone, PartialEq)]
pub struct Region(MultiPolygon<f64>);

impl Default for Region {
    fn default() -> Self {
        Self::new()
    }
}

impl Region {
    /// Creates an empty region.
    #[must_use]
    pub fn new() -> Self {
        Self(MultiPolygon::new(Vec::new()))
    }

    /// Creates a rectangular region from two opposite corners in DBU.
    #[must_use]
    pub fn from_rect(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self::from_box_f(x1 as f64, y1 as f64, x2 as f64, y2 as f64)
    }

    /// Creates a region from a single polygon outline in DBU.
    ///
    /// The outline does not need to be closed; orientation is normalized.
    #[must_use]
    pub fn from_points(points: &[(i64, i64)]) -> Self {
        let ring: Vec<Coord<f64>> = points
            .iter()
            .map(|&(x, y)| coord! { x: x as f64, y: y as f64 })
            .collect();
        let polygon = Polygon::new(LineString::new(ring), Vec::new());
        Self(MultiPolygon::new(vec![polygon]).orient(Direction::Default))
    }

    fn from_box_f(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let rect = Rect::new(coord! { x: x1, y: y1 }, coord! { x: x2, y: y2 });
        Self(MultiPolygon::new(vec![rect.to_polygon()]))
    }

    /// Unions an axis-aligned box into this region.
    ///
    /// Corner order does not matter. Used by the vertical wall accumulator,
    /// whose local-frame coordinates are not grid-aligned in general.
    pub fn insert_box(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        let other = Self::from_box_f(x1, y1, x2, y2);
        self.union_with(&other);
    }

    /// True if the region covers no area.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0 .0.is_empty()
    }

    /// Total covered area in DBU².
    #[must_use]
    pub fn area(&self) -> f64 {
        self.0.unsigned_area()
    }

    /// Unions `other` into this region.
    pub fn union_with(&mut self, other: &Region) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            self.0 = other.0.clone();
            return;
        }
        self.0 = self.0.union(&other.0);
    }

    /// Subtracts `other` from this region.
    pub fn subtract_with(&mut self, other: &Region) {
        if self.is_empty() || other.is_empty() {
            return;
        }
        self.0 = self.0.difference(&other.0);
    }

    /// Returns the intersection of this region with `other`.
    #[must_use]
    pub fn intersection(&self, other: &Region) -> Region {
        if self.is_empty() || other.is_empty() {
            return Region::new();
        }
        Self(self.0.intersection(&other.0))
    }

    /// Returns this region minus `other`.
    #[must_use]
    pub fn difference(&self, other: &Region) -> Region {
        let mut result = self.clone();
        result.subtract_with(other);
        result
    }

    /// The underlying polygon set, oriented exterior-CCW / holes-CW.
    #[must_use]
    pub fn polygons(&self) -> MultiPolygon<f64> {
        self.0.orient(Direction::Default)
    }

    /// Directed boundary edges on the integer grid.
    ///
    /// Exterior rings run counter-clockwise and holes clockwise, so the
    /// region interior is always to the left of each directed edge.
    #[must_use]
    pub fn edges(&self) -> EdgeSet {
        let oriented = self.polygons();
        let mut edges = Vec::new();
        for polygon in &oriented {
            collect_ring_edges(polygon.exterior(), &mut edges);
            for hole in polygon.interiors() {
                collect_ring_edges(hole, &mut edges);
            }
        }
        EdgeSet::from_edges(edges)
    }

    /// Returns this region grown outward by `d` DBU.
    ///
    /// Implemented as the union of the region with one expansion rectangle
    /// per boundary edge and one square per boundary vertex. Exact for
    /// rectilinear regions; diagonal corners get square caps.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::NegativeSizing`] if `d < 0`.
    pub fn sized(&self, d: i64) -> Result<Region> {
        if d < 0 {
            return Err(GeometryError::NegativeSizing(d).into());
        }
        if d == 0 || self.is_empty() {
            return Ok(self.clone());
        }
        let df = d as f64;
        let mut result = self.clone();
        let oriented = self.polygons();
        for polygon in &oriented {
            size_ring(polygon.exterior(), df, &mut result);
            for hole in polygon.interiors() {
                size_ring(hole, df, &mut result);
            }
        }
        Ok(result)
    }
}

fn collect_ring_edges(ring: &LineString<f64>, edges: &mut Vec<GridEdge>) {
    for pair in ring.0.windows(2) {
        let p1 = (snap(pair[0].x), snap(pair[0].y));
        let p2 = (snap(pair[1].x), snap(pair[1].y));
        if p1 != p2 {
            edges.push(GridEdge { p1, p2 });
        }
    }
}

fn size_ring(ring: &LineString<f64>, d: f64, result: &mut Region) {
    for pair in ring.0.windows(2) {
        let (ax, ay) = (pair[0].x, pair[0].y);
        let (bx, by) = (pair[1].x, pair[1].y);
        let (dx, dy) = (bx - ax, by - ay);
        let len = dx.hypot(dy);
        if len > 0.0 {
            let (nx, ny) = (dy / len * d, -dx / len * d);
            let quad = Polygon::new(
                LineString::new(vec![
                    coord! { x: ax - nx, y: ay - ny },
                    coord! { x: bx - nx, y: by - ny },
                    coord! { x: bx + nx, y: by + ny },
                    coord! { x: ax + nx, y: ay + ny },
                    coord! { x: ax - nx, y: ay - ny },
                ]),
                Vec::new(),
            );
            result.union_with(&Region(MultiPolygon::new(vec![quad])));
        }
        result.union_with(&Region::from_box_f(ax - d, ay - d, ax + d, ay + d));
    }
}

use std::collections::HashMap;

use crate::math::gcd;

/// A directed boundary edge on the integer DBU grid.
///
/// The owning region's interior lies to the left of `p1 -> p2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridEdge {
    pub p1: (i64, i64),
    pub p2: (i64, i64),
}

impl GridEdge {
    /// Edge vector `p2 - p1`.
    #[must_use]
    pub fn delta(&self) -> (i64, i64) {
        (self.p2.0 - self.p1.0, self.p2.1 - self.p1.1)
    }

    /// True if both endpoints coincide.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.p1 == self.p2
    }

    /// Exact key of the infinite line carrying this edge.
    ///
    /// The direction is gcd-reduced and sign-canonicalized so collinear
    /// edges of either orientation share one key; the offset is the integer
    /// cross product of the canonical direction with any point on the line.
    #[must_use]
    pub fn line_key(&self) -> LineKey {
        let (dx, dy) = self.delta();
        let g = gcd(dx.abs(), dy.abs());
        let (mut px, mut py) = (dx / g, dy / g);
        if px < 0 || (px == 0 && py < 0) {
            px = -px;
            py = -py;
        }
        LineKey {
            dir: (px, py),
            offset: px as i128 * self.p1.1 as i128 - py as i128 * self.p1.0 as i128,
        }
    }
}

/// Exact identity of an infinite grid line: primitive direction + offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub dir: (i64, i64),
    pub offset: i128,
}

impl LineKey {
    /// Scalar position of a grid point along this line (monotonic, exact).
    fn position(&self, p: (i64, i64)) -> i128 {
        self.dir.0 as i128 * p.0 as i128 + self.dir.1 as i128 * p.1 as i128
    }

    /// Grid point at scalar position `t`, given a reference point on the line.
    ///
    /// `t` must differ from the reference position by a multiple of
    /// `|dir|²`, which holds for positions of grid points on this line.
    #[allow(clippy::cast_possible_truncation)]
    fn point_at(&self, reference: (i64, i64), t: i128) -> (i64, i64) {
        let n2 = self.dir.0 as i128 * self.dir.0 as i128 + self.dir.1 as i128 * self.dir.1 as i128;
        let k = (t - self.position(reference)) / n2;
        (
            reference.0 + (k * self.dir.0 as i128) as i64,
            reference.1 + (k * self.dir.1 as i128) as i64,
        )
    }
}

/// A set of directed grid edges with collinear interval arithmetic.
///
/// `shared_with` keeps the portions of `self`'s edges that coincide with
/// edges of `other` (in `self`'s orientation), `difference` removes them.
/// These two operations are all the wall generator needs from an edge
/// boolean kernel.
#[derive(Debug, Clone, Default)]
pub struct EdgeSet {
    edges: Vec<GridEdge>,
}

impl EdgeSet {
    /// Creates an empty edge set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an edge set from raw edges, dropping degenerate ones.
    #[must_use]
    pub fn from_edges(edges: Vec<GridEdge>) -> Self {
        Self {
            edges: edges.into_iter().filter(|e| !e.is_degenerate()).collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GridEdge> {
        self.edges.iter()
    }

    /// Appends all edges of `other`.
    pub fn extend(&mut self, other: &EdgeSet) {
        self.edges.extend_from_slice(&other.edges);
    }

    /// Portions of `self`'s edges that geometrically coincide with edges of
    /// `other`, keeping `self`'s orientation.
    #[must_use]
    pub fn shared_with(&self, other: &EdgeSet) -> EdgeSet {
        self.clip(other, true)
    }

    /// `self` minus the portions that coincide with edges of `other`.
    #[must_use]
    pub fn difference(&self, other: &EdgeSet) -> EdgeSet {
        self.clip(other, false)
    }

    fn clip(&self, other: &EdgeSet, keep_shared: bool) -> EdgeSet {
        let intervals = other.intervals_by_line();
        let mut result = Vec::new();
        for edge in &self.edges {
            let key = edge.line_key();
            let t1 = key.position(edge.p1);
            let t2 = key.position(edge.p2);
            let forward = t1 < t2;
            let (lo, hi) = if forward { (t1, t2) } else { (t2, t1) };

            let mut kept: Vec<(i128, i128)> = Vec::new();
            match intervals.get(&key) {
                Some(spans) => {
                    if keep_shared {
                        for &(slo, shi) in spans {
                            let a = lo.max(slo);
                            let b = hi.min(shi);
                            if a < b {
                                kept.push((a, b));
                            }
                        }
                    } else {
                        let mut cursor = lo;
                        for &(slo, shi) in spans {
                            if shi <= cursor || slo >= hi {
                                continue;
                            }
                            if slo > cursor {
                                kept.push((cursor, slo));
                            }
                            cursor = cursor.max(shi);
                        }
                        if cursor < hi {
                            kept.push((cursor, hi));
                        }
                    }
                }
                None => {
                    if !keep_shared {
                        kept.push((lo, hi));
                    }
                }
            }

            for (a, b) in kept {
                let pa = key.point_at(edge.p1, a);
                let pb = key.point_at(edge.p1, b);
                let piece = if forward {
                    GridEdge { p1: pa, p2: pb }
                } else {
                    GridEdge { p1: pb, p2: pa }
                };
                if !piece.is_degenerate() {
                    result.push(piece);
                }
            }
        }
        EdgeSet { edges: result }
    }

    /// Merged, sorted coverage intervals per carrier line.
    fn intervals_by_line(&self) -> HashMap<LineKey, Vec<(i128, i128)>> {
        let mut raw: HashMap<LineKey, Vec<(i128, i128)>> = HashMap::new();
        for edge in &self.edges {
            let key = edge.line_key();
            let t1 = key.position(edge.p1);
            let t2 = key.position(edge.p2);
            raw.entry(key).or_default().push((t1.min(t2), t1.max(t2)));
        }
        for spans in raw.values_mut() {
            spans.sort_unstable();
            let mut merged: Vec<(i128, i128)> = Vec::with_capacity(spans.len());
            for &(lo, hi) in spans.iter() {
                match merged.last_mut() {
                    Some(last) if lo <= last.1 => last.1 = last.1.max(hi),
                    _ => merged.push((lo, hi)),
                }
            }
            *spans = merged;
        }
        raw
    }
}

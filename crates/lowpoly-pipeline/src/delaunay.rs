//! Incremental Bowyer-Watson triangulation over a bounding rectangle.
//!
//! The mesh starts as two seed triangles splitting the rectangle along
//! its diagonal; the four corners stay in the mesh forever, so the
//! triangulation covers the whole image without trimming. Each inserted
//! point removes the triangles whose circumcircle contains it and
//! re-triangulates the resulting cavity by fanning from the point to the
//! cavity's boundary edges.
//!
//! Cavity boundary recovery deduplicates unordered edges: an edge shared
//! by two removed triangles is interior to the cavity and is dropped;
//! edges seen exactly once form the boundary polygon.

use std::collections::HashMap;

use crate::types::{Dimensions, PipelineError, Point};

/// A triangle's circumcircle with its center truncated to the integer
/// lattice.
///
/// Center truncation is robust for this mesh because every vertex is
/// lattice-aligned and the seed vertices are the rectangle corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Circumcircle {
    /// Center x, truncated toward zero.
    pub x: i32,
    /// Center y, truncated toward zero.
    pub y: i32,
    /// Squared radius, measured from the truncated center.
    pub radius_squared: i64,
}

impl Circumcircle {
    /// Compute the circumcircle of three points, or `None` when they are
    /// collinear.
    #[allow(clippy::cast_possible_truncation)]
    fn of(p0: Point, p1: Point, p2: Point) -> Option<Self> {
        let ax = f64::from(p1.x - p0.x);
        let ay = f64::from(p1.y - p0.y);
        let bx = f64::from(p2.x - p0.x);
        let by = f64::from(p2.y - p0.y);

        let denom = 2.0 * (ax * by - ay * bx);
        if denom == 0.0 {
            return None;
        }

        let sq = |v: i32| i64::from(v) * i64::from(v);
        #[allow(clippy::cast_precision_loss)]
        let m = (sq(p1.x) - sq(p0.x) + sq(p1.y) - sq(p0.y)) as f64;
        #[allow(clippy::cast_precision_loss)]
        let u = (sq(p2.x) - sq(p0.x) + sq(p2.y) - sq(p0.y)) as f64;

        let s = 1.0 / denom;
        let cx = (f64::from(p2.y - p0.y) * m + f64::from(p0.y - p1.y) * u) * s;
        let cy = (f64::from(p0.x - p2.x) * m + f64::from(p1.x - p0.x) * u) * s;

        let x = cx as i32;
        let y = cy as i32;
        // Widen before subtracting: a sliver triangle can push the
        // truncated center to the ends of the i32 range.
        let dx = i64::from(p0.x) - i64::from(x);
        let dy = i64::from(p0.y) - i64::from(y);
        Some(Self {
            x,
            y,
            radius_squared: dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy)),
        })
    }

    /// Whether `point` lies strictly inside the circle.
    #[must_use]
    pub const fn contains(&self, point: Point) -> bool {
        let dx = self.x as i64 - point.x as i64;
        let dy = self.y as i64 - point.y as i64;
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy)) < self.radius_squared
    }
}

/// A mesh triangle: three distinct lattice vertices and the precomputed
/// circumcircle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    /// The vertices, in insertion order.
    pub nodes: [Point; 3],
    circle: Circumcircle,
}

impl Triangle {
    /// Build a triangle, or `None` when the vertices are collinear.
    fn new(p0: Point, p1: Point, p2: Point) -> Option<Self> {
        Circumcircle::of(p0, p1, p2).map(|circle| Self {
            nodes: [p0, p1, p2],
            circle,
        })
    }

    /// The precomputed circumcircle.
    #[must_use]
    pub const fn circumcircle(&self) -> Circumcircle {
        self.circle
    }

    /// Whether `point` is one of the three vertices.
    #[must_use]
    pub fn has_node(&self, point: Point) -> bool {
        self.nodes.contains(&point)
    }

    /// Twice the signed area (shoelace formula). The magnitude is the
    /// triangle's area doubled; the sign encodes winding.
    #[must_use]
    pub const fn doubled_signed_area(&self) -> i64 {
        let [p0, p1, p2] = self.nodes;
        let ax = (p1.x - p0.x) as i64;
        let ay = (p1.y - p0.y) as i64;
        let bx = (p2.x - p0.x) as i64;
        let by = (p2.y - p0.y) as i64;
        ax * by - ay * bx
    }
}

/// An unordered edge key: endpoints stored in canonical `(min, max)`
/// order so `{a, b}` and `{b, a}` hash identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct EdgeKey {
    a: Point,
    b: Point,
}

impl EdgeKey {
    fn new(p: Point, q: Point) -> Self {
        if (p.x, p.y) <= (q.x, q.y) {
            Self { a: p, b: q }
        } else {
            Self { a: q, b: p }
        }
    }
}

/// Incremental Bowyer-Watson triangulation state.
///
/// Owns its triangle vector outright; no state is shared between
/// instances or calls.
#[derive(Debug, Clone)]
pub struct Triangulation {
    triangles: Vec<Triangle>,
    degenerate_skips: usize,
}

impl Triangulation {
    /// Create the initial mesh: two triangles covering the `width` x
    /// `height` rectangle via its diagonal.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Math`] when either dimension is zero
    /// (the seed triangles would be degenerate).
    pub fn new(dimensions: Dimensions) -> Result<Self, PipelineError> {
        let w = i32::try_from(dimensions.width)
            .map_err(|_| PipelineError::BufferOverflow {
                width: dimensions.width,
                height: dimensions.height,
            })?;
        let h = i32::try_from(dimensions.height)
            .map_err(|_| PipelineError::BufferOverflow {
                width: dimensions.width,
                height: dimensions.height,
            })?;

        let p0 = Point::new(0, 0);
        let p1 = Point::new(w, 0);
        let p2 = Point::new(w, h);
        let p3 = Point::new(0, h);

        let lower = Triangle::new(p0, p2, p3);
        let upper = Triangle::new(p0, p1, p2);
        match (lower, upper) {
            (Some(lower), Some(upper)) => Ok(Self {
                triangles: vec![lower, upper],
                degenerate_skips: 0,
            }),
            _ => Err(PipelineError::Math(format!(
                "seed rectangle {w}x{h} has no area",
            ))),
        }
    }

    /// Insert a single point, rebuilding the cavity its circumcircle
    /// tests carve out.
    ///
    /// A point already present in the mesh lies *on* (not strictly
    /// inside) its incident circumcircles, carves no cavity, and leaves
    /// the mesh unchanged. Cavity triangles that would be collinear with
    /// the new point are skipped and counted in
    /// [`degenerate_skips`](Self::degenerate_skips); they carry no area.
    pub fn insert(&mut self, point: Point) {
        let mut kept = Vec::with_capacity(self.triangles.len() + 2);
        let mut cavity_edges: Vec<EdgeKey> = Vec::new();

        for triangle in &self.triangles {
            if triangle.circle.contains(point) {
                let [p0, p1, p2] = triangle.nodes;
                cavity_edges.push(EdgeKey::new(p0, p1));
                cavity_edges.push(EdgeKey::new(p1, p2));
                cavity_edges.push(EdgeKey::new(p2, p0));
            } else {
                kept.push(*triangle);
            }
        }

        // Edges seen twice are interior to the cavity; those seen once
        // form its boundary polygon.
        let mut counts: HashMap<EdgeKey, usize> = HashMap::with_capacity(cavity_edges.len());
        for edge in &cavity_edges {
            *counts.entry(*edge).or_insert(0) += 1;
        }

        for edge in cavity_edges {
            if counts.get(&edge) != Some(&1) {
                continue;
            }
            match Triangle::new(edge.a, edge.b, point) {
                Some(triangle) => kept.push(triangle),
                None => self.degenerate_skips += 1,
            }
        }

        self.triangles = kept;
    }

    /// Insert every point, in order.
    pub fn insert_all(&mut self, points: &[Point]) {
        for &point in points {
            self.insert(point);
        }
    }

    /// The current mesh.
    #[must_use]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Consume the state and return the mesh.
    #[must_use]
    pub fn into_triangles(self) -> Vec<Triangle> {
        self.triangles
    }

    /// How many collinear cavity triangles were skipped across all
    /// insertions. Nonzero only when inserted points fall exactly on a
    /// cavity boundary edge; the skipped triangles carry no area.
    #[must_use]
    pub const fn degenerate_skips(&self) -> usize {
        self.degenerate_skips
    }
}

//! Planar geometry primitives.
//!
//! Everything here is pure and allocation-free. Coordinates carry no unit: the
//! same functions serve normalized (0..1) and pixel-space points.
//!
//! - `point_in_polygon`: ray casting with a half-open crossing rule
//! - `orientation` / `on_segment` / `segments_intersect`: the classic
//!   orientation-based segment test, including collinear touching
//! - `BoundingBox`: axis-aligned rectangle with inclusive containment

use serde::{Deserialize, Serialize};

/// A 2D point. Whether it is normalized or in pixels is decided by the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle given by its top-left corner and extent.
///
/// Width and height are expected to be non-negative. A zero-area box is valid and
/// degrades to a point (or a segment) in every test below.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Corners in order: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [Point; 4] {
        let (r, b) = (self.right(), self.bottom());
        [
            Point::new(self.x, self.y),
            Point::new(r, self.y),
            Point::new(r, b),
            Point::new(self.x, b),
        ]
    }

    /// The four edges as consecutive corner pairs, wrapping.
    pub fn edges(&self) -> [(Point, Point); 4] {
        let c = self.corners();
        [(c[0], c[1]), (c[1], c[2]), (c[2], c[3]), (c[3], c[0])]
    }

    /// Inclusive on all four sides.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn is_degenerate(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }
}

/// Turn direction of an ordered point triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Collinear,
    Clockwise,
    CounterClockwise,
}

/// Ray-casting point-in-polygon test.
///
/// A horizontal ray is cast from `point` toward +x. Edge (j -> i) is crossed when
/// exactly one of its endpoints lies strictly above `point.y`; that half-open rule
/// makes vertices lying on the ray count once and skips horizontal edges before
/// the interpolation divides by `yi - yj`.
///
/// Points exactly on the boundary have no guaranteed classification. Slices with
/// fewer than three vertices return `false`.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (vi, vj) = (polygon[i], polygon[j]);
        if (vi.y > point.y) != (vj.y > point.y) {
            let x_at_y = vj.x + (point.y - vj.y) / (vi.y - vj.y) * (vi.x - vj.x);
            if point.x < x_at_y {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Orientation of (p, q, r) from the sign of the cross product.
pub fn orientation(p: Point, q: Point, r: Point) -> Orientation {
    let val = (q.y - p.y) * (r.x - q.x) - (q.x - p.x) * (r.y - q.y);
    if val == 0.0 {
        Orientation::Collinear
    } else if val > 0.0 {
        Orientation::Clockwise
    } else {
        Orientation::CounterClockwise
    }
}

/// Given collinear p, q, r: does q lie within the bounding box of segment p-r?
pub fn on_segment(p: Point, q: Point, r: Point) -> bool {
    q.x <= p.x.max(r.x) && q.x >= p.x.min(r.x) && q.y <= p.y.max(r.y) && q.y >= p.y.min(r.y)
}

/// Do the closed segments p1-q1 and p2-q2 share at least one point?
pub fn segments_intersect(p1: Point, q1: Point, p2: Point, q2: Point) -> bool {
    let o1 = orientation(p1, q1, p2);
    let o2 = orientation(p1, q1, q2);
    let o3 = orientation(p2, q2, p1);
    let o4 = orientation(p2, q2, q1);

    if o1 != o2 && o3 != o4 {
        return true;
    }

    // Collinear touching or overlapping.
    (o1 == Orientation::Collinear && on_segment(p1, p2, q1))
        || (o2 == Orientation::Collinear && on_segment(p1, q2, q1))
        || (o3 == Orientation::Collinear && on_segment(p2, p1, q2))
        || (o4 == Orientation::Collinear && on_segment(p2, q1, q2))
}

/// Is a polygon vertex inside the box (inclusive)?
pub fn vertex_in_box(vertex: Point, bbox: &BoundingBox) -> bool {
    bbox.contains(vertex)
}

/// Iterate polygon edges as consecutive vertex pairs, wrapping to the first.
pub fn polygon_edges(polygon: &[Point]) -> impl Iterator<Item = (Point, Point)> + '_ {
    let n = polygon.len();
    (0..n).map(move |i| (polygon[i], polygon[(i + 1) % n]))
}

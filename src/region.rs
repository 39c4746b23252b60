//! Box-vs-polygon overlap.
//!
//! A detection overlaps the restricted region when any part of its box touches the
//! polygon. Three sufficient conditions are checked in order and the first hit
//! wins:
//!
//! 1. a box corner lies inside the polygon (polygon engulfs the box, or partial overlap)
//! 2. a polygon vertex lies inside the box (box engulfs the polygon)
//! 3. a box edge intersects a polygon edge (crossing shapes, nothing contained)

use serde::Serialize;

use crate::geometry::{point_in_polygon, polygon_edges, segments_intersect, BoundingBox, Point};

/// Which overlap condition decided the result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum OverlapPath {
    CornerInPolygon,
    VertexInBox,
    EdgeCrossing,
}

/// Returns the first overlap condition that holds, or `None` when the box and the
/// polygon are disjoint.
pub fn overlap_path(bbox: &BoundingBox, polygon: &[Point]) -> Option<OverlapPath> {
    if polygon.len() < 3 {
        return None;
    }

    let corners = bbox.corners();
    if corners.iter().any(|&c| point_in_polygon(c, polygon)) {
        return Some(OverlapPath::CornerInPolygon);
    }

    if polygon.iter().any(|&v| bbox.contains(v)) {
        return Some(OverlapPath::VertexInBox);
    }

    let crossing = bbox.edges().iter().any(|&(p1, q1)| {
        polygon_edges(polygon).any(|(p2, q2)| segments_intersect(p1, q1, p2, q2))
    });
    if crossing {
        return Some(OverlapPath::EdgeCrossing);
    }

    None
}

/// "Any part touching" overlap test between an axis-aligned box and a polygon.
///
/// Polygons with fewer than three vertices never overlap.
pub fn box_intersects_polygon(bbox: &BoundingBox, polygon: &[Point]) -> bool {
    overlap_path(bbox, polygon).is_some()
}

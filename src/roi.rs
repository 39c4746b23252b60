//! Region of interest model.
//!
//! The restricted region is stored once, in normalized coordinates, and scaled to
//! pixel space on every evaluation. Frame dimensions can change between frames
//! (resolution switch, device rotation), so a `ScaledRoi` is never cached.
//!
//! `RoiHandle` is the only shared mutable ROI state. Replacement swaps an
//! `Arc<Roi>` under a lock, so a reader sees either the old polygon or the new one,
//! never a mix.

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

use crate::geometry::{BoundingBox, Point};
use crate::region::{box_intersects_polygon, overlap_path, OverlapPath};

/// Minimum vertex count for a closed polygon.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Ordered, implicitly closed vertex list with at least three vertices.
///
/// Simplicity (no self-intersection) is assumed, not checked.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Result<Self> {
        if vertices.len() < MIN_POLYGON_VERTICES {
            bail!(
                "polygon requires at least {} vertices, got {}",
                MIN_POLYGON_VERTICES,
                vertices.len()
            );
        }
        Ok(Self { vertices })
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Never true for a polygon built through `new`.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

impl TryFrom<Vec<Point>> for Polygon {
    type Error = anyhow::Error;

    fn try_from(vertices: Vec<Point>) -> Result<Self> {
        Self::new(vertices)
    }
}

impl From<Polygon> for Vec<Point> {
    fn from(polygon: Polygon) -> Self {
        polygon.vertices
    }
}

/// Restricted region in normalized (0..1) frame coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roi {
    polygon: Polygon,
}

impl Roi {
    pub fn new(polygon: Polygon) -> Self {
        Self { polygon }
    }

    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self> {
        let vertices = pairs.iter().copied().map(Point::from).collect();
        Ok(Self::new(Polygon::new(vertices)?))
    }

    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    pub fn vertices(&self) -> &[Point] {
        self.polygon.vertices()
    }

    /// Map every vertex into pixel space for a frame of the given size.
    pub fn scale(&self, frame_width: f64, frame_height: f64) -> ScaledRoi {
        let vertices = self
            .polygon
            .vertices()
            .iter()
            .map(|v| Point::new(v.x * frame_width, v.y * frame_height))
            .collect();
        ScaledRoi {
            polygon: Polygon { vertices },
            frame_width,
            frame_height,
        }
    }

    /// Reject non-finite or out-of-range coordinates.
    ///
    /// This belongs to configuration intake; the geometry never calls it.
    pub fn validate_normalized(&self) -> Result<()> {
        for (idx, v) in self.vertices().iter().enumerate() {
            let in_range = |c: f64| c.is_finite() && (0.0..=1.0).contains(&c);
            if !in_range(v.x) || !in_range(v.y) {
                return Err(anyhow!(
                    "roi vertex {} ({}, {}) is outside the normalized range [0, 1]",
                    idx,
                    v.x,
                    v.y
                ));
            }
        }
        Ok(())
    }
}

impl Default for Roi {
    /// Centered rectangle covering the middle 60% of the frame.
    fn default() -> Self {
        Self {
            polygon: Polygon {
                vertices: vec![
                    Point::new(0.2, 0.2),
                    Point::new(0.8, 0.2),
                    Point::new(0.8, 0.8),
                    Point::new(0.2, 0.8),
                ],
            },
        }
    }
}

/// Pixel-space polygon derived from a `Roi` for a single evaluation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScaledRoi {
    polygon: Polygon,
    pub frame_width: f64,
    pub frame_height: f64,
}

impl ScaledRoi {
    pub fn vertices(&self) -> &[Point] {
        self.polygon.vertices()
    }

    pub fn intersects(&self, bbox: &BoundingBox) -> bool {
        box_intersects_polygon(bbox, self.vertices())
    }

    pub fn overlap_path(&self, bbox: &BoundingBox) -> Option<OverlapPath> {
        overlap_path(bbox, self.vertices())
    }
}

/// Shared, atomically replaceable active ROI.
#[derive(Clone, Debug, Default)]
pub struct RoiHandle {
    active: Arc<RwLock<Arc<Roi>>>,
}

impl RoiHandle {
    pub fn new(roi: Roi) -> Self {
        Self {
            active: Arc::new(RwLock::new(Arc::new(roi))),
        }
    }

    /// Replace the active ROI wholesale. Takes effect on the next evaluation.
    pub fn set_roi(&self, roi: Roi) -> Result<()> {
        let mut guard = self
            .active
            .write()
            .map_err(|_| anyhow!("roi lock poisoned"))?;
        *guard = Arc::new(roi);
        Ok(())
    }

    /// The ROI value an evaluation should use from start to finish.
    pub fn snapshot(&self) -> Result<Arc<Roi>> {
        let guard = self
            .active
            .read()
            .map_err(|_| anyhow!("roi lock poisoned"))?;
        Ok(Arc::clone(&guard))
    }
}

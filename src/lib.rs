//! ROI Sentinel
//!
//! Real-time intrusion detection for a single restricted region of a video frame.
//!
//! # Architecture
//!
//! An external detector reports labelled bounding boxes per frame. The kernel decides,
//! frame by frame, whether any person box overlaps the restricted region and
//! publishes a single intrusion flag.
//!
//! 1. **Geometry**: ray-casting point-in-polygon and orientation-based segment tests.
//! 2. **Region overlap**: corner-in-polygon, vertex-in-box, and edge-crossing checks.
//! 3. **ROI model**: a normalized polygon scaled to pixel space on every frame.
//! 4. **Evaluation loop**: one evaluation in flight at a time, ROI snapshotted at
//!    evaluation start, state preserved across missed frames.
//!
//! # Module Structure
//!
//! - `geometry`, `region`, `roi`: the pure core
//! - `monitor`: `IntrusionMonitor::tick`, `evaluate_frame`, `AlertSink`
//! - `frame`, `ingest`, `detect`: frame source and detector boundaries
//! - `config`: daemon configuration (file + env)
//! - `ui`: console rendering sink

pub mod config;
pub mod detect;
pub mod frame;
pub mod geometry;
pub mod ingest;
pub mod monitor;
pub mod region;
pub mod roi;
pub mod ui;

pub use detect::{DetectedObject, DetectorBackend, ScriptedBackend, PERSON_LABEL};
pub use frame::{InferenceView, RawFrame};
pub use geometry::{
    on_segment, orientation, point_in_polygon, segments_intersect, vertex_in_box, BoundingBox,
    Orientation, Point,
};
pub use ingest::{FrameSource, SyntheticConfig, SyntheticSource};
pub use monitor::{
    evaluate_frame, AlertSink, Classification, FrameEvaluation, IntrusionMonitor, MonitorPhase,
    MonitorStats, TickOutcome,
};
pub use region::{box_intersects_polygon, overlap_path, OverlapPath};
pub use roi::{Polygon, Roi, RoiHandle, ScaledRoi};

//! Object detection boundary.
//!
//! The detection model is an external collaborator. This module only defines what
//! crosses the boundary: a backend trait that turns pixels into labelled boxes, and
//! a scripted backend used by the daemon's synthetic mode and by tests.

mod backend;
mod backends;
mod result;

pub use backend::DetectorBackend;
pub use backends::ScriptedBackend;
pub use result::{DetectedObject, PERSON_LABEL};

use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;
use std::time::Duration;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::DetectedObject;

/// Replays a fixed list of per-frame detections.
///
/// Each step is either the objects for one frame or `None`, which makes that call
/// fail as if the detector were unavailable. Steps cycle once the end is reached.
/// An optional latency makes every call sleep to imitate inference time.
pub struct ScriptedBackend {
    steps: Vec<Option<Vec<DetectedObject>>>,
    cursor: usize,
    latency: Option<Duration>,
    calls: u64,
}

impl ScriptedBackend {
    pub fn new(steps: Vec<Option<Vec<DetectedObject>>>) -> Result<Self> {
        if steps.is_empty() {
            bail!("detection script must contain at least one step");
        }
        Ok(Self {
            steps,
            cursor: 0,
            latency: None,
            calls: 0,
        })
    }

    /// Reports the same objects on every call.
    pub fn repeating(objects: Vec<DetectedObject>) -> Self {
        Self {
            steps: vec![Some(objects)],
            cursor: 0,
            latency: None,
            calls: 0,
        }
    }

    /// Load a script from a JSON file: an array of frames, each an array of objects
    /// or `null` for an unavailable frame.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read detection script {}", path.display()))?;
        let steps: Vec<Option<Vec<DetectedObject>>> = serde_json::from_str(&raw)
            .with_context(|| format!("invalid detection script {}", path.display()))?;
        Self::new(steps)
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = (!latency.is_zero()).then_some(latency);
        self
    }

    /// Number of `detect` calls served so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<Vec<DetectedObject>> {
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        self.calls += 1;

        let step = self.steps[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.steps.len();

        step.ok_or_else(|| anyhow!("scripted detector unavailable at call {}", self.calls))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;
    use std::io::Write;

    #[test]
    fn scripted_backend_cycles_steps() {
        let person = DetectedObject::person(BoundingBox::new(0.0, 0.0, 10.0, 10.0));
        let mut backend =
            ScriptedBackend::new(vec![Some(vec![person.clone()]), None, Some(vec![])]).unwrap();

        assert_eq!(backend.detect(b"f1", 10, 10).unwrap(), vec![person.clone()]);
        assert!(backend.detect(b"f2", 10, 10).is_err());
        assert!(backend.detect(b"f3", 10, 10).unwrap().is_empty());
        assert_eq!(backend.detect(b"f4", 10, 10).unwrap(), vec![person]);
        assert_eq!(backend.calls(), 4);
    }

    #[test]
    fn empty_script_is_rejected() {
        assert!(ScriptedBackend::new(vec![]).is_err());
    }

    #[test]
    fn loads_script_from_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"[
                [{"label":"person","bbox":{"x":0,"y":0,"width":5,"height":5},"score":0.9}],
                null
            ]"#,
        )
        .unwrap();

        let mut backend = ScriptedBackend::from_json_file(file.path()).unwrap();
        let first = backend.detect(b"", 10, 10).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].score, 0.9);
        assert!(backend.detect(b"", 10, 10).is_err());
    }
}

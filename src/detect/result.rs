use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

/// Class label that counts toward intrusion by default.
pub const PERSON_LABEL: &str = "person";

/// One object reported by the detector for one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Class label as reported by the model (e.g. "person", "car").
    pub label: String,
    /// Bounding box in pixel coordinates.
    pub bbox: BoundingBox,
    /// Detector confidence. Carried for rendering; the engine does not filter on it.
    #[serde(default = "default_score")]
    pub score: f32,
}

fn default_score() -> f32 {
    1.0
}

impl DetectedObject {
    pub fn new(label: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            bbox,
            score: default_score(),
        }
    }

    pub fn person(bbox: BoundingBox) -> Self {
        Self::new(PERSON_LABEL, bbox)
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    pub fn is_class(&self, label: &str) -> bool {
        self.label == label
    }

    pub fn is_person(&self) -> bool {
        self.is_class(PERSON_LABEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_default_score() {
        let obj: DetectedObject = serde_json::from_str(
            r#"{"label":"person","bbox":{"x":1.0,"y":2.0,"width":3.0,"height":4.0}}"#,
        )
        .unwrap();
        assert!(obj.is_person());
        assert_eq!(obj.score, 1.0);
        assert_eq!(obj.bbox, BoundingBox::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn class_matching_is_exact() {
        let car = DetectedObject::new("car", BoundingBox::default()).with_score(0.4);
        assert!(!car.is_person());
        assert!(car.is_class("car"));
        assert!(!car.is_class("Car"));
        assert_eq!(car.score, 0.4);
    }
}

use serde::{Deserialize, Serialize};

/// One tracked box returned by the detector for a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
    pub class_id: u32,
    /// Persistent identifier assigned by the tracker, stable across frames.
    pub track_id: i64,
}

impl Detection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, track_id: i64, class_id: u32) -> Self {
        Self { x1, y1, x2, y2, score: 1.0, class_id, track_id }
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }
}

//! Persistent track ids for detectors that only return per-frame boxes.
//!
//! Greedy IoU matching against the previous frame's boxes of the same class:
//! highest-overlap pairs are matched first, leftovers get fresh ids. Unmatched
//! tracks are forgotten immediately.

use crate::domain::detection::Detection;

#[derive(Debug, Clone)]
pub struct IouTrackAssigner {
    min_iou: f32,
    next_id: i64,
    previous: Vec<Detection>,
}

impl IouTrackAssigner {
    pub fn new(min_iou: f32) -> Self {
        Self { min_iou, next_id: 1, previous: Vec::new() }
    }

    /// Overwrite `track_id` on every detection of the current frame.
    pub fn assign(&mut self, detections: &mut [Detection]) {
        let mut candidates = Vec::new();
        for (ci, cur) in detections.iter().enumerate() {
            for (pi, prev) in self.previous.iter().enumerate() {
                if cur.class_id != prev.class_id {
                    continue;
                }
                let overlap = iou(cur, prev);
                if overlap >= self.min_iou {
                    candidates.push((overlap, ci, pi));
                }
            }
        }
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut current_taken = vec![false; detections.len()];
        let mut previous_taken = vec![false; self.previous.len()];
        for (_, ci, pi) in candidates {
            if current_taken[ci] || previous_taken[pi] {
                continue;
            }
            current_taken[ci] = true;
            previous_taken[pi] = true;
            detections[ci].track_id = self.previous[pi].track_id;
        }

        for (ci, det) in detections.iter_mut().enumerate() {
            if !current_taken[ci] {
                det.track_id = self.next_id;
                self.next_id += 1;
            }
        }

        self.previous = detections.to_vec();
    }
}

pub fn iou(a: &Detection, b: &Detection) -> f32 {
    let ix1 = a.x1.max(b.x1);
    let iy1 = a.y1.max(b.y1);
    let ix2 = a.x2.min(b.x2);
    let iy2 = a.y2.min(b.y2);
    let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    let union = a.area() + b.area() - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

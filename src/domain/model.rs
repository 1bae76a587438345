use serde::{Deserialize, Serialize};
use std::time::Duration;

/// COCO ids for car, motorcycle, bus and truck.
pub const DEFAULT_VEHICLE_CLASSES: [u32; 4] = [2, 3, 5, 7];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoloParams {
    pub input_size: u32,        // 640 typical
    pub conf_threshold: f32,    // 0..1
    pub iou_threshold: f32,     // NMS overlap cut-off
    pub max_detections: usize,  // e.g. 300
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            conf_threshold: 0.5,
            iou_threshold: 0.45,
            max_detections: 100,
        }
    }
}

/// Rules turning raw detections into hazards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardPolicy {
    /// Horizontal center displacement (pixels) between two processed frames
    /// above which a vehicle counts as driving rashly.
    pub movement_threshold: f32,
    pub vehicle_classes: Vec<u32>,
    pub pothole_class: u32,
    pub pothole_severity: u8,
}

impl Default for HazardPolicy {
    fn default() -> Self {
        Self {
            movement_threshold: 50.0,
            vehicle_classes: DEFAULT_VEHICLE_CLASSES.to_vec(),
            pothole_class: 0,
            pothole_severity: 8,
        }
    }
}

impl HazardPolicy {
    pub fn is_vehicle(&self, class_id: u32) -> bool {
        self.vehicle_classes.contains(&class_id)
    }
}

/// Acquisition loop tuning.
#[derive(Debug, Clone)]
pub struct PipelineParams {
    /// Only every Nth source frame goes through detection.
    pub skip_factor: u64,
    /// Fixed pause after each processed frame.
    pub frame_delay: Duration,
    pub jpeg_quality: u8,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            skip_factor: 3,
            frame_delay: Duration::from_millis(30),
            jpeg_quality: 60,
        }
    }
}

impl PipelineParams {
    pub fn should_process(&self, frame_id: u64) -> bool {
        let n = self.skip_factor.max(1);
        frame_id % n == 0
    }
}

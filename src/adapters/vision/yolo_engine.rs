use anyhow::Result;
use image::{imageops::FilterType, RgbImage};
use ndarray::{s, Array4, ArrayViewD, Axis, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Value;
use std::fs;
use std::path::Path;
use tracing::info;

use super::track_assigner::{iou, IouTrackAssigner};
use crate::application::ports::DetectorPort;
use crate::domain::detection::Detection;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::YoloParams;

/// Minimum overlap for a box to inherit the previous frame's track id.
const TRACK_MIN_IOU: f32 = 0.3;

pub fn validate_model_path(path: &str) -> DomainResult<()> {
    if path.trim().is_empty() {
        return Err(DomainError::InvalidInput("model path empty".into()));
    }
    if !Path::new(path).exists() {
        return Err(DomainError::NotFound(format!("model file not found: {path}")));
    }
    Ok(())
}

pub struct OnnxYoloEngine {
    session: Session,
}

impl OnnxYoloEngine {
    pub fn load(path: &str) -> Result<Self> {
        validate_model_path(path)?;
        let mut builder = Session::builder()?.with_intra_threads(4)?;

        // CUDA is optional; fall back to CPU when it can't be registered.
        let cuda = CUDAExecutionProvider::default().build();
        if let Ok(builder_with_cuda) = builder.clone().with_execution_providers([cuda]) {
            builder = builder_with_cuda;
        }

        let model_bytes = fs::read(path)?;
        let session = builder.commit_from_memory(&model_bytes)?;
        info!("ONNX model loaded: {}", path);

        Ok(Self { session })
    }

    /// Boxes in source-frame pixels, best score first, `track_id` unset (-1).
    pub fn infer(&mut self, rgb: &RgbImage, params: &YoloParams) -> Result<Vec<Detection>> {
        let imgsz = params.input_size as usize;
        let resized = image::imageops::resize(rgb, imgsz as u32, imgsz as u32, FilterType::Nearest);

        let mut input = Array4::<f32>::zeros((1, 3, imgsz, imgsz));
        for (x, y, pixel) in resized.enumerate_pixels() {
            input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
            input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
            input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
        }

        let input_shape = vec![1, 3, imgsz as i64, imgsz as i64];
        let (raw, _) = input.into_raw_vec_and_offset();
        let input_tensor = Value::from_array((input_shape, raw))?;

        let outputs = self.session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        // [1, 4 + classes, candidates]
        let dims: Vec<usize> = shape_out.iter().map(|&x| x as usize).collect();
        let array_view = ArrayViewD::from_shape(IxDyn(&dims), data_out)?;
        let view = array_view.index_axis(Axis(0), 0);
        if view.ndim() != 2 || view.shape()[0] <= 4 {
            anyhow::bail!("unexpected YOLO output shape {:?}", dims);
        }

        let num_candidates = view.shape()[1];
        let sx = rgb.width() as f32 / imgsz as f32;
        let sy = rgb.height() as f32 / imgsz as f32;

        let mut candidates = Vec::new();
        for i in 0..num_candidates {
            let scores = view.slice(s![4.., i]);
            let Some((class_id, &max_score)) = scores
                .indexed_iter()
                .max_by(|(_, a), (_, b)| a.total_cmp(b))
            else {
                continue;
            };

            if max_score > params.conf_threshold {
                let cx = view[[0, i]];
                let cy = view[[1, i]];
                let w = view[[2, i]];
                let h = view[[3, i]];

                candidates.push(Detection {
                    x1: (cx - w / 2.0) * sx,
                    y1: (cy - h / 2.0) * sy,
                    x2: (cx + w / 2.0) * sx,
                    y2: (cy + h / 2.0) * sy,
                    score: max_score,
                    class_id: class_id as u32,
                    track_id: -1,
                });
            }
        }

        Ok(non_max_suppression(candidates, params.iou_threshold, params.max_detections))
    }
}

/// Per-class greedy NMS. Output is sorted by descending score.
pub fn non_max_suppression(mut candidates: Vec<Detection>, iou_threshold: f32, limit: usize) -> Vec<Detection> {
    candidates.sort_unstable_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<Detection> = Vec::new();
    for cand in candidates {
        if kept.len() >= limit {
            break;
        }
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == cand.class_id && iou(k, &cand) > iou_threshold);
        if !suppressed {
            kept.push(cand);
        }
    }
    kept
}

/// YOLO inference plus track-id assignment across frames.
pub struct YoloDetector {
    engine: OnnxYoloEngine,
    params: YoloParams,
    assigner: IouTrackAssigner,
}

impl YoloDetector {
    pub fn new(engine: OnnxYoloEngine, params: YoloParams) -> Self {
        Self { engine, params, assigner: IouTrackAssigner::new(TRACK_MIN_IOU) }
    }
}

impl DetectorPort for YoloDetector {
    fn name(&self) -> &'static str {
        "onnx-yolo"
    }

    fn detect(&mut self, frame: &RgbImage) -> DomainResult<Vec<Detection>> {
        let mut detections = self
            .engine
            .infer(frame, &self.params)
            .map_err(|e| DomainError::OperationFailed(format!("yolo inference failed: {e:#}")))?;
        self.assigner.assign(&mut detections);
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(x: f32, score: f32, class_id: u32) -> Detection {
        Detection { score, ..Detection::new(x, 0.0, x + 50.0, 50.0, -1, class_id) }
    }

    #[test]
    fn nms_drops_weaker_overlaps_of_the_same_class() {
        let kept = non_max_suppression(
            vec![scored(2.0, 0.6, 2), scored(0.0, 0.9, 2), scored(1.0, 0.8, 0), scored(200.0, 0.7, 2)],
            0.45,
            10,
        );
        let summary: Vec<_> = kept.iter().map(|d| (d.class_id, d.score)).collect();
        assert_eq!(summary, vec![(2, 0.9), (0, 0.8), (2, 0.7)]);
    }

    #[test]
    fn nms_respects_limit() {
        let kept = non_max_suppression(vec![scored(0.0, 0.9, 2), scored(300.0, 0.8, 2)], 0.45, 1);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn missing_model_is_not_found() {
        assert!(matches!(validate_model_path("/nonexistent/yolo.onnx"), Err(DomainError::NotFound(_))));
        assert!(matches!(validate_model_path("  "), Err(DomainError::InvalidInput(_))));
    }
}

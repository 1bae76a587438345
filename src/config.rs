use clap::Parser;
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::{HazardPolicy, PipelineParams, YoloParams, DEFAULT_VEHICLE_CLASSES};

/// Server settings; every flag can also come from a `HAZARD_*` variable.
#[derive(Parser, Debug, Clone)]
#[command(name = "hazard-stream", about = "Road hazard detection streamed over WebSocket")]
pub struct ServerArgs {
    /// stub://<frames>, /dev/videoN, an image directory, or a video file
    #[arg(long, env = "HAZARD_SOURCE", default_value = "stub://300")]
    pub source: String,

    #[arg(long, env = "HAZARD_BIND", default_value = "0.0.0.0:8000")]
    pub bind: String,

    /// SQLite hazard log
    #[arg(long, env = "HAZARD_DB", default_value = "hazard_log.db")]
    pub db: String,

    #[arg(long, env = "HAZARD_STATIC_DIR", default_value = "static")]
    pub static_dir: String,

    /// YOLO ONNX model; without it frames pass through undetected
    #[arg(long, env = "HAZARD_MODEL")]
    pub model: Option<String>,

    /// Process every Nth frame
    #[arg(long, env = "HAZARD_SKIP", default_value_t = 3)]
    pub skip: u64,

    #[arg(long, env = "HAZARD_FRAME_DELAY_MS", default_value_t = 30)]
    pub frame_delay_ms: u64,

    #[arg(long, env = "HAZARD_JPEG_QUALITY", default_value_t = 60)]
    pub jpeg_quality: u8,

    /// Horizontal movement (px) between processed frames that counts as rash driving
    #[arg(long, env = "HAZARD_RASH_THRESHOLD", default_value_t = 50.0)]
    pub rash_threshold: f32,

    #[arg(long, env = "HAZARD_POTHOLE_CLASS", default_value_t = 0)]
    pub pothole_class: u32,

    #[arg(long, env = "HAZARD_VEHICLE_CLASSES", value_delimiter = ',')]
    pub vehicle_classes: Vec<u32>,

    #[arg(long, env = "HAZARD_CONFIDENCE", default_value_t = 0.5)]
    pub confidence: f32,

    /// Per-consumer backlog before a slow consumer starts skipping messages
    #[arg(long, env = "HAZARD_STREAM_CAPACITY", default_value_t = 64)]
    pub stream_capacity: usize,
}

impl ServerArgs {
    pub fn validate(&self) -> DomainResult<()> {
        if self.skip == 0 {
            return Err(DomainError::InvalidInput("--skip must be at least 1".into()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(DomainError::InvalidInput("--jpeg-quality must be in 1..=100".into()));
        }
        if !self.rash_threshold.is_finite() || self.rash_threshold < 0.0 {
            return Err(DomainError::InvalidInput("--rash-threshold must be >= 0".into()));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(DomainError::InvalidInput("--confidence must be in 0..=1".into()));
        }
        if self.stream_capacity == 0 {
            return Err(DomainError::InvalidInput("--stream-capacity must be at least 1".into()));
        }
        Ok(())
    }

    pub fn pipeline_params(&self) -> PipelineParams {
        PipelineParams {
            skip_factor: self.skip,
            frame_delay: Duration::from_millis(self.frame_delay_ms),
            jpeg_quality: self.jpeg_quality,
        }
    }

    pub fn hazard_policy(&self) -> HazardPolicy {
        let vehicle_classes = if self.vehicle_classes.is_empty() {
            DEFAULT_VEHICLE_CLASSES.to_vec()
        } else {
            self.vehicle_classes.clone()
        };
        HazardPolicy {
            movement_threshold: self.rash_threshold,
            vehicle_classes,
            pothole_class: self.pothole_class,
            ..HazardPolicy::default()
        }
    }

    pub fn yolo_params(&self) -> YoloParams {
        YoloParams { conf_threshold: self.confidence, ..YoloParams::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServerArgs {
        ServerArgs::try_parse_from(std::iter::once("hazard-stream").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_the_reference_tuning() {
        let args = parse(&[]);
        args.validate().unwrap();
        let params = args.pipeline_params();
        assert_eq!(params.skip_factor, 3);
        assert_eq!(params.frame_delay, Duration::from_millis(30));
        assert_eq!(params.jpeg_quality, 60);
        let policy = args.hazard_policy();
        assert_eq!(policy.movement_threshold, 50.0);
        assert_eq!(policy.vehicle_classes, vec![2, 3, 5, 7]);
        assert_eq!(policy.pothole_class, 0);
        assert!(args.model.is_none());
    }

    #[test]
    fn flags_override_tuning() {
        let args = parse(&[
            "--source", "/dev/video2",
            "--skip", "5",
            "--rash-threshold", "80",
            "--vehicle-classes", "2,7",
            "--confidence", "0.25",
        ]);
        assert_eq!(args.source, "/dev/video2");
        assert_eq!(args.pipeline_params().skip_factor, 5);
        assert_eq!(args.hazard_policy().movement_threshold, 80.0);
        assert_eq!(args.hazard_policy().vehicle_classes, vec![2, 7]);
        assert_eq!(args.yolo_params().conf_threshold, 0.25);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(parse(&["--skip", "0"]).validate().is_err());
        assert!(parse(&["--jpeg-quality", "0"]).validate().is_err());
        assert!(parse(&["--confidence", "1.5"]).validate().is_err());
        assert!(ServerArgs::try_parse_from(["hazard-stream", "--skip", "-1"]).is_err());
    }
}

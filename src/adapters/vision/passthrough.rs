use image::RgbImage;

use crate::application::ports::DetectorPort;
use crate::domain::{detection::Detection, errors::DomainResult};

/// Detector used when no model is configured: frames flow through
/// unannotated and no hazards are raised.
#[derive(Debug, Default)]
pub struct PassthroughDetector;

impl DetectorPort for PassthroughDetector {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn detect(&mut self, _frame: &RgbImage) -> DomainResult<Vec<Detection>> {
        Ok(Vec::new())
    }
}

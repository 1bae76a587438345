use image::{codecs::jpeg::JpegEncoder, ExtendedColorType, Rgb, RgbImage};

use crate::application::ports::FrameEncoderPort;
use crate::domain::{
    detection::Detection,
    errors::{DomainError, DomainResult},
    model::HazardPolicy,
};

const VEHICLE_COLOR: Rgb<u8> = Rgb([0, 220, 0]);
const POTHOLE_COLOR: Rgb<u8> = Rgb([230, 30, 30]);
const OTHER_COLOR: Rgb<u8> = Rgb([240, 200, 0]);
const BOX_THICKNESS: i32 = 2;

/// Draws detection boxes and compresses the frame to JPEG.
pub struct JpegAnnotator {
    quality: u8,
    policy: HazardPolicy,
}

impl JpegAnnotator {
    pub fn new(quality: u8, policy: HazardPolicy) -> Self {
        Self { quality: quality.clamp(1, 100), policy }
    }

    fn color_for(&self, det: &Detection) -> Rgb<u8> {
        if det.class_id == self.policy.pothole_class {
            POTHOLE_COLOR
        } else if self.policy.is_vehicle(det.class_id) {
            VEHICLE_COLOR
        } else {
            OTHER_COLOR
        }
    }

    pub fn annotate(&self, frame: &RgbImage, detections: &[Detection]) -> RgbImage {
        let mut out = frame.clone();
        for det in detections {
            let color = self.color_for(det);
            for inset in 0..BOX_THICKNESS {
                draw_rectangle(
                    &mut out,
                    det.x1 as i32 + inset,
                    det.y1 as i32 + inset,
                    det.x2 as i32 - inset,
                    det.y2 as i32 - inset,
                    color,
                );
            }
        }
        out
    }
}

impl FrameEncoderPort for JpegAnnotator {
    fn encode(&self, frame: &RgbImage, detections: &[Detection]) -> DomainResult<Vec<u8>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(DomainError::InvalidInput("empty frame".into()));
        }
        let annotated = self.annotate(frame, detections);
        let mut jpeg = Vec::new();
        let mut enc = JpegEncoder::new_with_quality(&mut jpeg, self.quality);
        enc.encode(
            annotated.as_raw(),
            annotated.width(),
            annotated.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| DomainError::OperationFailed(format!("jpeg encoding failed: {e}")))?;
        Ok(jpeg)
    }
}

/// Outline a box, clipped to the image.
fn draw_rectangle(image: &mut RgbImage, left: i32, top: i32, right: i32, bottom: i32, color: Rgb<u8>) {
    let width = image.width() as i32;
    let height = image.height() as i32;
    if right < left || bottom < top || right < 0 || bottom < 0 || left >= width || top >= height {
        return;
    }
    let l = left.clamp(0, width - 1);
    let r = right.clamp(0, width - 1);
    let t = top.clamp(0, height - 1);
    let b = bottom.clamp(0, height - 1);

    for x in l..=r {
        if top >= 0 {
            image.put_pixel(x as u32, t as u32, color);
        }
        if bottom < height {
            image.put_pixel(x as u32, b as u32, color);
        }
    }
    for y in t..=b {
        if left >= 0 {
            image.put_pixel(l as u32, y as u32, color);
        }
        if right < width {
            image.put_pixel(r as u32, y as u32, color);
        }
    }
}

use anyhow::{anyhow, Result};
use image::{ImageFormat, Rgb, RgbImage};
use tracing::info;
use v4l::format::FourCC;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::Device;

use crate::application::ports::FrameSourcePort;
use crate::domain::errors::{DomainError, DomainResult};

pub struct CaptureConfig {
    pub camera_path: String,
    pub fourcc: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl CaptureConfig {
    pub fn for_device(camera_path: &str) -> Self {
        Self {
            camera_path: camera_path.to_string(),
            fourcc: "MJPG".into(),
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

struct OpenCapture {
    stream: Stream<'static>,
    fourcc: FourCC,
    width: u32,
    height: u32,
}

/// Live camera through V4L2 memory-mapped buffers. Never reports end of
/// source; a failed dequeue is an error.
pub struct V4l2Source {
    cfg: CaptureConfig,
    capture: Option<OpenCapture>,
}

impl V4l2Source {
    pub fn new(cfg: CaptureConfig) -> Self {
        Self { cfg, capture: None }
    }

    fn start(cfg: &CaptureConfig) -> Result<OpenCapture> {
        let dev = Device::with_path(&cfg.camera_path)?;

        let mut fmt = dev.format()?;
        let b = cfg.fourcc.as_bytes();
        if b.len() != 4 {
            return Err(anyhow!("FourCC must have 4 characters"));
        }
        fmt.fourcc = FourCC::new(&[b[0], b[1], b[2], b[3]]);
        fmt.width = cfg.width;
        fmt.height = cfg.height;
        // The driver may adjust to the nearest supported format.
        let actual_fmt = dev.set_format(&fmt)?;

        let mut params = dev.params()?;
        params.interval.numerator = 1;
        params.interval.denominator = cfg.fps;
        let _ = dev.set_params(&params);

        // The stream borrows the device for its whole life.
        let dev_static: &'static Device = Box::leak(Box::new(dev));
        let stream = Stream::with_buffers(dev_static, v4l::buffer::Type::VideoCapture, 4)?;

        info!(
            "Source opened: {} {}x{} [{}] at {} FPS",
            cfg.camera_path, actual_fmt.width, actual_fmt.height, actual_fmt.fourcc, cfg.fps
        );

        Ok(OpenCapture {
            stream,
            fourcc: actual_fmt.fourcc,
            width: actual_fmt.width,
            height: actual_fmt.height,
        })
    }
}

impl OpenCapture {
    fn next_rgb(&mut self) -> Result<RgbImage> {
        let (data, _) = self.stream.next()?;
        let fcc_str = self.fourcc.str().map_err(|_| anyhow!("invalid FourCC"))?;

        match fcc_str {
            "MJPG" => Ok(image::load_from_memory_with_format(data, ImageFormat::Jpeg)?.to_rgb8()),
            "YUYV" => Ok(yuyv_to_rgb(data, self.width, self.height)),
            _ => Err(anyhow!("camera format {} not supported", fcc_str)),
        }
    }
}

impl FrameSourcePort for V4l2Source {
    fn describe(&self) -> String {
        self.cfg.camera_path.clone()
    }

    fn open(&mut self) -> DomainResult<()> {
        let capture = Self::start(&self.cfg)
            .map_err(|e| DomainError::SourceUnavailable(format!("{}: {e:#}", self.cfg.camera_path)))?;
        self.capture = Some(capture);
        Ok(())
    }

    fn read(&mut self) -> DomainResult<Option<RgbImage>> {
        let capture = self
            .capture
            .as_mut()
            .ok_or_else(|| DomainError::SourceUnavailable("camera not opened".into()))?;
        capture
            .next_rgb()
            .map(Some)
            .map_err(|e| DomainError::OperationFailed(format!("camera read failed: {e:#}")))
    }

    fn release(&mut self) {
        self.capture = None;
    }
}

/// YUYV (YUV 4:2:2) to RGB, BT.601. Every 4 bytes `[Y0, U, Y1, V]` hold two pixels.
fn yuyv_to_rgb(yuyv: &[u8], w: u32, h: u32) -> RgbImage {
    let mut out = RgbImage::new(w, h);
    for (i, chunk) in yuyv.chunks_exact(4).enumerate() {
        let y0 = chunk[0] as f32;
        let u = chunk[1] as f32 - 128.0;
        let y1 = chunk[2] as f32;
        let v = chunk[3] as f32 - 128.0;

        let to_rgb = |y: f32| {
            Rgb([
                (y + 1.402 * v).clamp(0.0, 255.0) as u8,
                (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8,
                (y + 1.772 * u).clamp(0.0, 255.0) as u8,
            ])
        };

        let pixel_idx = i as u32 * 2;
        let x = pixel_idx % w;
        let y = pixel_idx / w;
        if y < h {
            out.put_pixel(x, y, to_rgb(y0));
            if x + 1 < w {
                out.put_pixel(x + 1, y, to_rgb(y1));
            }
        }
    }
    out
}

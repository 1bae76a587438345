use anyhow::{Context, Result};
use ffmpeg_next as ffmpeg;
use image::RgbImage;
use std::path::Path;
use tracing::info;

use crate::application::ports::FrameSourcePort;
use crate::domain::errors::{DomainError, DomainResult};

struct Decoding {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    flushed: bool,
}

/// Video file decoded with FFmpeg, converted to RGB24.
pub struct FfmpegFileSource {
    path: String,
    decoding: Option<Decoding>,
}

impl FfmpegFileSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), decoding: None }
    }

    fn start(path: &str) -> Result<Decoding> {
        if !Path::new(path).exists() {
            anyhow::bail!("file not found");
        }
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&path)
            .with_context(|| format!("failed to open video file '{path}' with ffmpeg"))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow::anyhow!("file has no video track"))?;
        let stream_index = input_stream.index();
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context.decoder().video().context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        Ok(Decoding { input, stream_index, decoder, scaler, flushed: false })
    }
}

impl Decoding {
    fn next_rgb(&mut self) -> Result<Option<RgbImage>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.convert(&decoded).map(Some);
            }
            if self.flushed {
                return Ok(None);
            }
            let stream_index = self.stream_index;
            match self.input.packets().find(|(stream, _)| stream.index() == stream_index) {
                Some((_, packet)) => self
                    .decoder
                    .send_packet(&packet)
                    .context("send packet to ffmpeg decoder")?,
                None => {
                    // Drain frames still buffered in the decoder.
                    self.decoder.send_eof().context("flush ffmpeg decoder")?;
                    self.flushed = true;
                }
            }
        }
    }

    fn convert(&mut self, decoded: &ffmpeg::frame::Video) -> Result<RgbImage> {
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler.run(decoded, &mut rgb_frame).context("scale frame to RGB")?;
        let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;
        RgbImage::from_raw(width, height, pixels).context("RGB buffer size mismatch")
    }
}

impl FrameSourcePort for FfmpegFileSource {
    fn describe(&self) -> String {
        self.path.clone()
    }

    fn open(&mut self) -> DomainResult<()> {
        let decoding = Self::start(&self.path)
            .map_err(|e| DomainError::SourceUnavailable(format!("{}: {e:#}", self.path)))?;
        info!("Source opened: {} (ffmpeg)", self.path);
        self.decoding = Some(decoding);
        Ok(())
    }

    fn read(&mut self) -> DomainResult<Option<RgbImage>> {
        let decoding = self
            .decoding
            .as_mut()
            .ok_or_else(|| DomainError::SourceUnavailable("video file not opened".into()))?;
        decoding
            .next_rgb()
            .map_err(|e| DomainError::OperationFailed(format!("decode failed: {e:#}")))
    }

    fn release(&mut self) {
        self.decoding = None;
    }
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0) as usize;
    let data = frame.data(0);

    if stride == row_bytes {
        let packed = data
            .get(..row_bytes * height as usize)
            .context("ffmpeg frame is shorter than expected")?;
        return Ok((packed.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(
            data.get(start..start + row_bytes)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }
    Ok((pixels, width, height))
}

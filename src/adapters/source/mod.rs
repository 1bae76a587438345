//! Frame sources selected from a single source string.

use anyhow::Result;
use std::path::Path;

use crate::application::ports::FrameSourcePort;

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod image_dir;
pub mod synthetic;
#[cfg(feature = "v4l2")]
pub mod v4l2;

pub use image_dir::ImageDirSource;
pub use synthetic::SyntheticSource;

/// `stub://<frames>`, `/dev/videoN`, an image directory, or a video file.
/// Nothing is opened here; a missing path fails later in `open`.
pub fn build_source(source: &str) -> Result<Box<dyn FrameSourcePort>> {
    let source = source.trim();
    if source.is_empty() {
        anyhow::bail!("empty source");
    }
    if source.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::parse(source)?));
    }
    if source.contains("://") {
        anyhow::bail!("unsupported source '{source}': only local paths and stub:// are accepted");
    }
    if source.starts_with("/dev/video") {
        return camera(source);
    }
    let path = Path::new(source);
    if path.is_dir() || path.extension().is_none() {
        return Ok(Box::new(ImageDirSource::new(path)));
    }
    video_file(source)
}

#[cfg(feature = "v4l2")]
fn camera(source: &str) -> Result<Box<dyn FrameSourcePort>> {
    Ok(Box::new(v4l2::V4l2Source::new(v4l2::CaptureConfig::for_device(source))))
}

#[cfg(not(feature = "v4l2"))]
fn camera(source: &str) -> Result<Box<dyn FrameSourcePort>> {
    anyhow::bail!("camera source '{source}' requires the v4l2 feature")
}

#[cfg(feature = "ffmpeg")]
fn video_file(source: &str) -> Result<Box<dyn FrameSourcePort>> {
    Ok(Box::new(ffmpeg::FfmpegFileSource::new(source)))
}

#[cfg(not(feature = "ffmpeg"))]
fn video_file(source: &str) -> Result<Box<dyn FrameSourcePort>> {
    anyhow::bail!("video file source '{source}' requires the ffmpeg feature")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_backend_from_the_source_string() {
        assert_eq!(build_source("stub://5").unwrap().describe(), "stub://5");
        assert_eq!(build_source("/tmp/frames-that-do-not-exist").unwrap().describe(), "/tmp/frames-that-do-not-exist");
        assert!(build_source("").is_err());
        assert!(build_source("rtsp://cam/1").is_err());
    }

    #[cfg(not(feature = "ffmpeg"))]
    #[test]
    fn video_files_need_ffmpeg() {
        assert!(build_source("road.mp4").is_err());
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::info;

use crate::application::ports::FrameSourcePort;
use crate::domain::errors::{DomainError, DomainResult};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Image sequence read from a directory in file-name order.
pub struct ImageDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
}

impl ImageDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), files: Vec::new(), cursor: 0 }
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSourcePort for ImageDirSource {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    fn open(&mut self) -> DomainResult<()> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            DomainError::SourceUnavailable(format!("cannot read image directory '{}': {e}", self.dir.display()))
        })?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_image(p))
            .collect();
        files.sort();
        info!("Source opened: {} ({} images)", self.dir.display(), files.len());
        self.files = files;
        self.cursor = 0;
        Ok(())
    }

    /// An undecodable file still occupies its position in the sequence.
    fn read(&mut self) -> DomainResult<Option<RgbImage>> {
        let Some(path) = self.files.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        image::open(path)
            .map(|img| Some(img.to_rgb8()))
            .map_err(|e| DomainError::CorruptFrame(format!("{}: {e}", path.display())))
    }

    fn release(&mut self) {
        self.files.clear();
        self.cursor = 0;
    }
}

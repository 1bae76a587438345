use image::{Rgb, RgbImage};
use tracing::info;

use crate::application::ports::FrameSourcePort;
use crate::domain::errors::{DomainError, DomainResult};

pub const SYNTHETIC_WIDTH: u32 = 320;
pub const SYNTHETIC_HEIGHT: u32 = 240;

/// `stub://<frames>` source: a gradient that slides one column per frame.
/// `stub://` with no count never ends.
pub struct SyntheticSource {
    limit: Option<u64>,
    produced: u64,
    opened: bool,
}

impl SyntheticSource {
    pub fn new(limit: Option<u64>) -> Self {
        Self { limit, produced: 0, opened: false }
    }

    pub fn parse(source: &str) -> DomainResult<Self> {
        let rest = source
            .strip_prefix("stub://")
            .ok_or_else(|| DomainError::InvalidInput(format!("not a stub source: {source}")))?;
        if rest.is_empty() {
            return Ok(Self::new(None));
        }
        let limit = rest
            .parse::<u64>()
            .map_err(|_| DomainError::InvalidInput(format!("bad frame count in '{source}'")))?;
        Ok(Self::new(Some(limit)))
    }

    fn render(&self) -> RgbImage {
        let shift = self.produced as u32;
        RgbImage::from_fn(SYNTHETIC_WIDTH, SYNTHETIC_HEIGHT, |x, y| {
            let v = ((x + shift) % 256) as u8;
            Rgb([v, (y % 256) as u8, 255 - v])
        })
    }
}

impl FrameSourcePort for SyntheticSource {
    fn describe(&self) -> String {
        match self.limit {
            Some(n) => format!("stub://{n}"),
            None => "stub://".into(),
        }
    }

    fn open(&mut self) -> DomainResult<()> {
        self.produced = 0;
        self.opened = true;
        info!("Source opened: {} (synthetic)", self.describe());
        Ok(())
    }

    fn read(&mut self) -> DomainResult<Option<RgbImage>> {
        if !self.opened {
            return Err(DomainError::SourceUnavailable("synthetic source not opened".into()));
        }
        if self.limit.is_some_and(|n| self.produced >= n) {
            return Ok(None);
        }
        let frame = self.render();
        self.produced += 1;
        Ok(Some(frame))
    }

    fn release(&mut self) {
        self.opened = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_exactly_the_requested_frames() {
        let mut source = SyntheticSource::parse("stub://4").unwrap();
        source.open().unwrap();
        let mut n = 0;
        while let Some(frame) = source.read().unwrap() {
            assert_eq!(frame.dimensions(), (SYNTHETIC_WIDTH, SYNTHETIC_HEIGHT));
            n += 1;
        }
        assert_eq!(n, 4);
        assert!(source.read().unwrap().is_none());
    }

    #[test]
    fn consecutive_frames_differ() {
        let mut source = SyntheticSource::new(None);
        source.open().unwrap();
        let a = source.read().unwrap().unwrap();
        let b = source.read().unwrap().unwrap();
        assert_ne!(a.get_pixel(0, 0), b.get_pixel(0, 0));
    }

    #[test]
    fn rejects_bad_counts_and_unopened_reads() {
        assert!(SyntheticSource::parse("stub://many").is_err());
        let mut source = SyntheticSource::new(Some(1));
        assert!(matches!(source.read(), Err(DomainError::SourceUnavailable(_))));
    }
}

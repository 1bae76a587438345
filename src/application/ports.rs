use async_trait::async_trait;
use image::RgbImage;

use crate::domain::{
    detection::Detection,
    errors::DomainResult,
    hazard::{HazardEvent, HazardReport, NewHazard, PersistedHazard},
    stream::StreamMessage,
};

/// Ordered frames from a file, directory or device.
pub trait FrameSourcePort: Send {
    fn describe(&self) -> String;
    /// Fails when the source does not exist or cannot be opened.
    fn open(&mut self) -> DomainResult<()>;
    /// `Ok(None)` at end of source. `Err(CorruptFrame)` consumes one source
    /// position without yielding a frame; any other error ends the stream.
    fn read(&mut self) -> DomainResult<Option<RgbImage>>;
    fn release(&mut self);
}

/// Object detection + tracking. Boxes carry persistent track ids.
pub trait DetectorPort: Send {
    fn name(&self) -> &'static str;
    fn detect(&mut self, frame: &RgbImage) -> DomainResult<Vec<Detection>>;
}

/// Draws detections onto the frame and compresses it for the wire.
pub trait FrameEncoderPort: Send {
    fn encode(&self, frame: &RgbImage, detections: &[Detection]) -> DomainResult<Vec<u8>>;
}

/// Fan-out side of the transport. Never blocks the caller.
pub trait StreamPublisherPort: Send + Sync {
    fn publish(&self, msg: StreamMessage);
    fn close(&self);
}

/// Fire-and-forget persistence handoff. Implementations must not block or
/// surface storage errors.
pub trait EventSinkPort: Send + Sync {
    fn record_report(&self, report: HazardReport);

    fn record(&self, event: &HazardEvent) {
        self.record_report(HazardReport::from(event));
    }
}

#[async_trait]
pub trait HazardStorePort: Send + Sync {
    async fn save(&self, hazard: NewHazard) -> DomainResult<PersistedHazard>;
    /// Newest first.
    async fn recent(&self, limit: usize) -> DomainResult<Vec<PersistedHazard>>;
    async fn count(&self) -> DomainResult<u64>;
}

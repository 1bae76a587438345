//! Frame acquisition loop: read, skip, detect, track, synthesize, encode,
//! publish, pace.
//!
//! One `FramePipeline` owns one source and its motion tracker, and runs on a
//! dedicated thread so frames are handled strictly in order.

use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::application::ports::{
    DetectorPort, EventSinkPort, FrameEncoderPort, FrameSourcePort, StreamPublisherPort,
};
use crate::domain::{
    errors::{DomainError, DomainResult},
    model::{HazardPolicy, PipelineParams},
    stream::{summarize_detections, StreamMessage},
    synthesizer::synthesize,
    tracker::MotionTracker,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Idle,
    Opening,
    Streaming,
    Draining,
    Closed,
}

/// Shared, read-mostly view of a pipeline's current state.
#[derive(Debug, Clone)]
pub struct PipelineStatus(Arc<RwLock<PipelineState>>);

impl Default for PipelineStatus {
    fn default() -> Self {
        Self(Arc::new(RwLock::new(PipelineState::Idle)))
    }
}

impl PipelineStatus {
    pub fn get(&self) -> PipelineState {
        match self.0.read() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set(&self, state: PipelineState) {
        match self.0.write() {
            Ok(mut guard) => *guard = state,
            Err(poisoned) => *poisoned.into_inner() = state,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Every source position consumed, skipped or corrupt included.
    pub frames_read: u64,
    pub frames_processed: u64,
    pub frames_sent: u64,
    pub events_emitted: u64,
}

/// Collaborators wired into a pipeline.
pub struct PipelineParts {
    pub source: Box<dyn FrameSourcePort>,
    pub detector: Box<dyn DetectorPort>,
    pub encoder: Box<dyn FrameEncoderPort>,
    pub publisher: Arc<dyn StreamPublisherPort>,
    pub sink: Arc<dyn EventSinkPort>,
}

pub struct FramePipeline {
    parts: PipelineParts,
    tracker: MotionTracker,
    policy: HazardPolicy,
    params: PipelineParams,
    status: PipelineStatus,
}

impl FramePipeline {
    pub fn new(parts: PipelineParts, policy: HazardPolicy, params: PipelineParams) -> Self {
        Self {
            parts,
            tracker: MotionTracker::new(&policy),
            policy,
            params,
            status: PipelineStatus::default(),
        }
    }

    pub fn status(&self) -> PipelineStatus {
        self.status.clone()
    }

    /// Run the pipeline on its own named thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<DomainResult<PipelineReport>>> {
        std::thread::Builder::new()
            .name("frame-pipeline".into())
            .spawn(move || self.run())
    }

    /// Drive the source to its end. Only a source that cannot be opened is an
    /// error; everything else is recovered per frame.
    pub fn run(mut self) -> DomainResult<PipelineReport> {
        let mut report = PipelineReport::default();
        let source_name = self.parts.source.describe();

        self.status.set(PipelineState::Opening);
        if let Err(e) = self.parts.source.open() {
            error!("Pipeline: cannot open source {}: {}", source_name, e);
            self.parts.publisher.close();
            self.status.set(PipelineState::Closed);
            return Err(e);
        }
        info!(
            "Pipeline: streaming {} with detector '{}' (every {} frame(s))",
            source_name,
            self.parts.detector.name(),
            self.params.skip_factor
        );

        self.status.set(PipelineState::Streaming);
        let mut frame_id: u64 = 0;
        loop {
            let frame = match self.parts.source.read() {
                Ok(Some(frame)) => Some(frame),
                Err(DomainError::CorruptFrame(reason)) => {
                    warn!("Pipeline: frame {} unreadable, skipped: {}", frame_id + 1, reason);
                    None
                }
                Ok(None) => {
                    info!("Pipeline: end of source after {} frames", frame_id);
                    break;
                }
                Err(e) => {
                    warn!("Pipeline: read failed after {} frames, draining: {}", frame_id, e);
                    break;
                }
            };
            frame_id += 1;
            report.frames_read += 1;
            let Some(frame) = frame else {
                continue;
            };

            if !self.params.should_process(frame_id) {
                continue;
            }
            self.process_frame(frame_id, &frame, &mut report);

            if !self.params.frame_delay.is_zero() {
                std::thread::sleep(self.params.frame_delay);
            }
        }

        self.status.set(PipelineState::Draining);
        self.parts.publisher.close();
        self.parts.source.release();
        self.status.set(PipelineState::Closed);
        info!(
            "Pipeline: closed ({} read, {} processed, {} sent, {} hazards)",
            report.frames_read, report.frames_processed, report.frames_sent, report.events_emitted
        );
        Ok(report)
    }

    fn process_frame(&mut self, frame_id: u64, frame: &image::RgbImage, report: &mut PipelineReport) {
        report.frames_processed += 1;

        let detections = self.parts.detector.detect(frame).unwrap_or_else(|e| {
            warn!("Pipeline: detection failed on frame {}: {}", frame_id, e);
            Vec::new()
        });
        debug!("Pipeline: frame {} -> [{}]", frame_id, summarize_detections(&detections));

        let signals = self.tracker.update(&detections);
        let events = synthesize(frame_id, &detections, &signals, &self.policy);

        match self.parts.encoder.encode(frame, &detections) {
            Ok(jpeg) => {
                self.parts.publisher.publish(StreamMessage::Frame(jpeg));
                report.frames_sent += 1;
            }
            Err(e) => {
                // The frame and its hazards are dropped together; the tracker
                // has already seen it.
                warn!("Pipeline: frame {} skipped, encoding failed: {}", frame_id, e);
                return;
            }
        }

        for event in &events {
            match StreamMessage::event(event) {
                Ok(msg) => self.parts.publisher.publish(msg),
                Err(e) => warn!("Pipeline: cannot serialize hazard: {}", e),
            }
            self.parts.sink.record(event);
            info!(
                "⚠️ {} hazard on frame {} (severity {})",
                event.kind.as_str(),
                frame_id,
                event.severity
            );
        }
        report.events_emitted += events.len() as u64;
    }
}

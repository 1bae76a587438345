use std::sync::Arc;

use crate::adapters::stream::StreamHub;
use crate::application::pipeline::PipelineStatus;
use crate::application::services::HazardService;

/// Shared state for the axum handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Fan-out of frames and hazard events to WebSocket consumers.
    pub hub: StreamHub,
    /// Hazard log use cases.
    pub hazards: Arc<HazardService>,
    pub pipeline: PipelineStatus,
}

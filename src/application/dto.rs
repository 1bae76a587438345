use serde::{Deserialize, Serialize};

use crate::application::pipeline::PipelineState;
use crate::domain::hazard::{NewHazard, PersistedHazard};

/// Body of `POST /log-hazard`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogHazardRequest {
    pub hazard_type: String,
    pub location_data: String,
    pub severity: i64,
}

impl From<LogHazardRequest> for NewHazard {
    fn from(r: LogHazardRequest) -> Self {
        NewHazard {
            hazard_type: r.hazard_type,
            location_data: r.location_data,
            severity: r.severity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogHazardResponse {
    pub message: String,
    pub hazard_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HazardsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HazardsResponse {
    pub total: u64,
    pub hazards: Vec<PersistedHazard>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub pipeline: PipelineState,
    pub consumers: usize,
}

use std::sync::Arc;

use crate::{
    application::ports::{EventSinkPort, HazardStorePort},
    domain::{
        errors::{DomainError, DomainResult},
        hazard::{HazardReport, NewHazard, PersistedHazard},
    },
};

const MAX_LISTED_HAZARDS: usize = 500;

/// Hazard log use cases: direct logging, listing, and the fire-and-forget
/// path for reports arriving over the stream.
#[derive(Clone)]
pub struct HazardService {
    store: Arc<dyn HazardStorePort>,
    sink: Arc<dyn EventSinkPort>,
}

impl HazardService {
    pub fn new(store: Arc<dyn HazardStorePort>, sink: Arc<dyn EventSinkPort>) -> Self {
        Self { store, sink }
    }

    /// Synchronous logging for the REST endpoint; the caller gets the row id.
    pub async fn log(&self, hazard: NewHazard) -> DomainResult<PersistedHazard> {
        if hazard.hazard_type.trim().is_empty() {
            return Err(DomainError::InvalidInput("hazard_type empty".into()));
        }
        self.store.save(hazard).await
    }

    /// Queue a report received from a consumer; never fails.
    pub fn accept_report(&self, report: HazardReport) {
        self.sink.record_report(report);
    }

    pub async fn recent(&self, limit: usize) -> DomainResult<Vec<PersistedHazard>> {
        self.store.recent(limit.min(MAX_LISTED_HAZARDS)).await
    }

    pub async fn count(&self) -> DomainResult<u64> {
        self.store.count().await
    }
}

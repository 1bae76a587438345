use async_trait::async_trait;
use std::sync::Mutex;

use super::now_s;
use crate::application::ports::HazardStorePort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::hazard::{NewHazard, PersistedHazard};

/// Volatile hazard log; ids start at 1 like an autoincrement column.
#[derive(Default)]
pub struct InMemoryHazardStore {
    rows: Mutex<Vec<PersistedHazard>>,
}

impl InMemoryHazardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<PersistedHazard> {
        self.rows.lock().map(|rows| rows.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl HazardStorePort for InMemoryHazardStore {
    async fn save(&self, hazard: NewHazard) -> DomainResult<PersistedHazard> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| DomainError::Storage("hazard log lock poisoned".into()))?;
        let row = PersistedHazard {
            id: rows.len() as i64 + 1,
            hazard_type: hazard.hazard_type,
            timestamp: now_s(),
            location_data: hazard.location_data,
            severity: hazard.severity,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn recent(&self, limit: usize) -> DomainResult<Vec<PersistedHazard>> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| DomainError::Storage("hazard log lock poisoned".into()))?;
        Ok(rows.iter().rev().take(limit).cloned().collect())
    }

    async fn count(&self) -> DomainResult<u64> {
        Ok(self.snapshot().len() as u64)
    }
}

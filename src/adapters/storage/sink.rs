use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::application::ports::{EventSinkPort, HazardStorePort};
use crate::domain::hazard::{HazardReport, NewHazard};

/// Non-blocking handoff of hazards to a persistence worker.
///
/// `record_report` only enqueues, so callers on the frame path never wait on
/// the store. Store failures are logged by the worker and dropped.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<HazardReport>,
}

impl EventSink {
    /// Start the worker on the current tokio runtime. The worker stops once
    /// every clone of the sink is dropped and the queue is drained.
    pub fn spawn(store: Arc<dyn HazardStorePort>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(persist_worker(rx, store));
        (Self { tx }, worker)
    }

    /// Wait up to `grace` for the worker to persist what is still queued.
    /// Only completes once every sink handle has been dropped.
    pub async fn finish(worker: JoinHandle<()>, grace: Duration) -> bool {
        match tokio::time::timeout(grace, worker).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!("Hazard sink worker failed: {}", e);
                false
            }
            Err(_) => {
                warn!("Hazard sink still busy after {:?}, queued hazards may be lost", grace);
                false
            }
        }
    }
}

impl EventSinkPort for EventSink {
    fn record_report(&self, report: HazardReport) {
        if self.tx.send(report).is_err() {
            warn!("Hazard sink stopped, dropping hazard");
        }
    }
}

async fn persist_worker(
    mut rx: mpsc::UnboundedReceiver<HazardReport>,
    store: Arc<dyn HazardStorePort>,
) {
    while let Some(report) = rx.recv().await {
        match store.save(NewHazard::from(report)).await {
            Ok(row) => debug!("Hazard persisted: type={}, id={}", row.hazard_type, row.id),
            Err(e) => error!("Hazard persistence failed: {}", e),
        }
    }
    debug!("Hazard sink worker finished");
}

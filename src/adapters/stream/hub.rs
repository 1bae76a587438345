//! Broadcast fan-out of frames and hazard events to attached consumers.
//!
//! Every consumer owns its own broadcast receiver, so a slow consumer only
//! lags itself: it skips what it missed and never stalls the producer or the
//! other consumers. Consumers see only what is published after they attach.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use crate::application::ports::StreamPublisherPort;
use crate::domain::stream::StreamMessage;

pub type ConnectionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Pipeline,
    Consumer(ConnectionId),
}

#[derive(Debug, Clone)]
struct Envelope {
    origin: Origin,
    message: StreamMessage,
}

#[derive(Clone)]
pub struct StreamHub {
    tx: broadcast::Sender<Envelope>,
    connections: Arc<RwLock<HashSet<ConnectionId>>>,
    next_id: Arc<AtomicU64>,
}

impl StreamHub {
    /// `capacity` is the per-consumer backlog before a consumer starts lagging.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            connections: Arc::new(RwLock::new(HashSet::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Attach a consumer. It is detached when the returned subscription drops.
    pub fn connect(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let rx = self.tx.subscribe();
        let active = {
            let mut set = write_set(&self.connections);
            set.insert(id);
            set.len()
        };
        info!("WS connected: consumer #{} (active: {})", id, active);
        Subscription {
            id,
            rx,
            connections: self.connections.clone(),
        }
    }

    pub fn consumer_count(&self) -> usize {
        match self.connections.read() {
            Ok(set) => set.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Republish something a consumer sent to every other consumer.
    pub fn relay(&self, from: ConnectionId, message: StreamMessage) {
        self.send(Envelope { origin: Origin::Consumer(from), message });
    }

    fn send(&self, envelope: Envelope) {
        // Err only means nobody is attached right now.
        let _ = self.tx.send(envelope);
    }
}

impl StreamPublisherPort for StreamHub {
    fn publish(&self, message: StreamMessage) {
        self.send(Envelope { origin: Origin::Pipeline, message });
    }

    fn close(&self) {
        self.send(Envelope { origin: Origin::Pipeline, message: StreamMessage::EndOfStream });
    }
}

/// One consumer's view of the stream.
pub struct Subscription {
    id: ConnectionId,
    rx: broadcast::Receiver<Envelope>,
    connections: Arc<RwLock<HashSet<ConnectionId>>>,
}

impl Subscription {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Next message for this consumer, in publication order. Messages relayed
    /// from this consumer itself are not echoed back.
    pub async fn next(&mut self) -> Option<StreamMessage> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) => {
                    if envelope.origin == Origin::Consumer(self.id) {
                        continue;
                    }
                    return Some(envelope.message);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("WS consumer #{} lagging, skipped {} message(s)", self.id, skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let active = {
            let mut set = write_set(&self.connections);
            set.remove(&self.id);
            set.len()
        };
        info!("WS disconnected: consumer #{} (active: {})", self.id, active);
    }
}

fn write_set(
    lock: &RwLock<HashSet<ConnectionId>>,
) -> std::sync::RwLockWriteGuard<'_, HashSet<ConnectionId>> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

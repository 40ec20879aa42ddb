// =============================================================================
// Subscriber Registry — live outbound channels and fan-out
// =============================================================================
//
// Every connected subscriber is represented by a handle wrapping the sending
// half of a bounded queue; the connection task owns the receiving half and
// writes whatever arrives to its socket.
//
// Fan-out iterates over a snapshot taken under the read lock, so handles
// added or removed while a fan-out is in flight are neither skipped nor sent
// to twice.  A failed send (queue closed or full) removes only that handle.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Maximum number of payloads queued for a single subscriber.  A subscriber
/// that falls this far behind is treated as broken.
pub const SUBSCRIBER_QUEUE_DEPTH: usize = 16;

pub type SubscriberId = Uuid;

/// Cloneable handle to one subscriber's outbound queue.
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    id: SubscriberId,
    peer: String,
    connected_at: DateTime<Utc>,
    tx: mpsc::Sender<Arc<str>>,
}

impl SubscriberHandle {
    /// Create a handle and the receiver the connection task drains.
    pub fn new(peer: impl Into<String>) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_DEPTH);
        let handle = Self {
            id: Uuid::new_v4(),
            peer: peer.into(),
            connected_at: Utc::now(),
            tx,
        };
        (handle, rx)
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Whether the connection side is still draining this queue.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue `payload` without waiting.
    pub fn send(&self, payload: Arc<str>) -> Result<()> {
        self.tx.try_send(payload).map_err(|e| match e {
            TrySendError::Full(_) => anyhow!("subscriber {} queue is full", self.id),
            TrySendError::Closed(_) => anyhow!("subscriber {} channel is closed", self.id),
        })
    }
}

/// Serialisable view of one subscriber for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriberInfo {
    pub id: String,
    pub peer: String,
    pub connected_at: String,
}

/// Outcome of a single fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    pub delivered: usize,
    pub removed: usize,
}

/// Thread-safe set of currently open subscriber handles.
#[derive(Default)]
pub struct SubscriberRegistry {
    handles: RwLock<HashMap<SubscriberId, SubscriberHandle>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `handle`.  Returns `false` if a handle with the same id was already
    /// registered (the registry is left unchanged).
    pub fn register(&self, handle: SubscriberHandle) -> bool {
        let mut handles = self.handles.write();
        if handles.contains_key(&handle.id) {
            return false;
        }
        info!(id = %handle.id, peer = %handle.peer, total = handles.len() + 1, "subscriber registered");
        handles.insert(handle.id, handle);
        true
    }

    /// Remove the handle with `id`.  Returns `false` if it was not registered.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let mut handles = self.handles.write();
        match handles.remove(&id) {
            Some(handle) => {
                info!(id = %id, peer = %handle.peer, total = handles.len(), "subscriber unregistered");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.handles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.read().is_empty()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.handles.read().contains_key(&id)
    }

    /// Copy of the current handle set.
    pub fn snapshot(&self) -> Vec<SubscriberHandle> {
        self.handles.read().values().cloned().collect()
    }

    pub fn describe(&self) -> Vec<SubscriberInfo> {
        self.handles
            .read()
            .values()
            .map(|h| SubscriberInfo {
                id: h.id.to_string(),
                peer: h.peer.clone(),
                connected_at: h.connected_at.to_rfc3339(),
            })
            .collect()
    }

    /// Drop handles whose connection side has already gone away.
    pub fn prune_closed(&self) -> usize {
        let mut handles = self.handles.write();
        let before = handles.len();
        handles.retain(|_, h| h.is_open());
        let pruned = before - handles.len();
        if pruned > 0 {
            debug!(pruned, "closed subscriber handles pruned");
        }
        pruned
    }

    /// Deliver `payload` to every subscriber registered when the call starts.
    pub fn fan_out(&self, payload: Arc<str>) -> FanOutReport {
        let targets = self.snapshot();
        let mut report = FanOutReport::default();
        let mut failed = Vec::new();

        for handle in &targets {
            match handle.send(Arc::clone(&payload)) {
                Ok(()) => {
                    report.delivered += 1;
                    debug!(id = %handle.id, bytes = payload.len(), "payload queued");
                }
                Err(e) => {
                    warn!(id = %handle.id, peer = %handle.peer, error = %e, "delivery failed — dropping subscriber");
                    failed.push(handle.id);
                }
            }
        }

        for id in failed {
            if self.unregister(id) {
                report.removed += 1;
            }
        }
        report
    }
}

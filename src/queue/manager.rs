use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::connection::ConnectionRegistry;

/// Result of a join request against a location queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Nobody suitable was waiting; the requester now waits at `position`
    /// (1-based, equal to the queue length after the append).
    Queued { position: usize },
    /// A waiting connection was found. The partner queued first and becomes
    /// side A; the requester becomes side B.
    Paired { partner_id: String },
}

/// Per-location FIFO queues of waiting connections.
///
/// Queues are created lazily on first join and never destroyed; an empty
/// queue costs nothing. All mutations go through one lock around the whole
/// table, so every operation is a single atomic step to its callers.
pub struct LocationQueues {
    queues: Mutex<HashMap<String, VecDeque<String>>>,
    registry: Arc<dyn ConnectionRegistry>,
}

impl LocationQueues {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            registry,
        }
    }

    /// Pairs the requester with the queue head, or appends it to the tail.
    ///
    /// A stale head (a connection that left while waiting) is discarded and
    /// the requester queues instead; the stale entry is already gone from
    /// the registry, so it is simply not re-added.
    #[instrument(skip(self))]
    pub async fn join_or_pair(&self, connection_id: &str, location_id: &str) -> JoinOutcome {
        let mut queues = self.queues.lock().await;

        // A connection waits in at most one queue. A re-join moves it to
        // the tail of the new queue rather than pairing it with itself.
        for queue in queues.values_mut() {
            queue.retain(|id| id != connection_id);
        }

        let queue = queues.entry(location_id.to_string()).or_default();

        if let Some(candidate) = queue.pop_front() {
            if self.registry.is_live(&candidate).await {
                debug!(partner_id = %candidate, "Paired with queue head");
                return JoinOutcome::Paired {
                    partner_id: candidate,
                };
            }
            debug!(stale_id = %candidate, "Discarded stale queue head");
        }

        queue.push_back(connection_id.to_string());
        let position = queue.len();
        debug!(position, "Connection queued");
        JoinOutcome::Queued { position }
    }

    /// Idempotent removal; absent identifiers are not an error.
    #[instrument(skip(self))]
    pub async fn remove_from_queue(&self, location_id: &str, connection_id: &str) {
        let mut queues = self.queues.lock().await;
        if let Some(queue) = queues.get_mut(location_id) {
            queue.retain(|id| id != connection_id);
        }
    }

    /// Removes the connection from every queue; used on disconnect.
    #[instrument(skip(self))]
    pub async fn remove_everywhere(&self, connection_id: &str) {
        let mut queues = self.queues.lock().await;
        for queue in queues.values_mut() {
            queue.retain(|id| id != connection_id);
        }
    }

    /// Appends a survivor back to its location's queue and returns its
    /// position. Requeue never pairs, even when someone is already waiting;
    /// the survivor is picked up by the next join request that finds it at
    /// the head.
    #[instrument(skip(self))]
    pub async fn requeue(&self, location_id: &str, connection_id: &str) -> usize {
        let mut queues = self.queues.lock().await;
        for queue in queues.values_mut() {
            queue.retain(|id| id != connection_id);
        }
        let queue = queues.entry(location_id.to_string()).or_default();
        queue.push_back(connection_id.to_string());
        queue.len()
    }

    /// Snapshot of the waiting connections at a location, head first.
    pub async fn waiting_at(&self, location_id: &str) -> Vec<String> {
        let queues = self.queues.lock().await;
        queues
            .get(location_id)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }
}

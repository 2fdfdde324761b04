use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use crate::websockets::WebSocketMessage;

/// Attributes a connection picks up when it requests to join a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionAttributes {
    pub location_id: String,
    pub display_name: String,
}

/// Registry of live transport sessions.
///
/// The registry is the only component that knows about transport handles;
/// the queue manager and match engine reach connections exclusively through
/// `is_live` and `deliver`, so a disappeared peer is an ordinary lookup miss
/// rather than a transport error.
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Called when a transport session begins. The entry has no location or
    /// display name until the connection sends its join request.
    async fn register(&self, connection_id: String, sender: mpsc::UnboundedSender<String>);

    /// Records the location and display name chosen on join. Idempotent;
    /// calling again overwrites the prior values.
    async fn set_attributes(&self, connection_id: &str, location_id: &str, display_name: &str);

    /// Attributes recorded by `set_attributes`, if the connection is still
    /// registered and has joined a location.
    async fn attributes(&self, connection_id: &str) -> Option<ConnectionAttributes>;

    /// Whether the connection still has an active transport.
    async fn is_live(&self, connection_id: &str) -> bool;

    /// Best-effort push to the connection. A connection that already left
    /// is a no-op, not an error.
    async fn deliver(&self, connection_id: &str, message: &WebSocketMessage);

    /// Called on disconnect; purges the entry.
    async fn remove(&self, connection_id: &str);
}

struct ConnectionEntry {
    sender: mpsc::UnboundedSender<String>,
    attributes: Option<ConnectionAttributes>,
}

pub struct InMemoryConnectionRegistry {
    // connection_id -> transport handle + join attributes
    connections: RwLock<HashMap<String, ConnectionEntry>>,
}

impl InMemoryConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionRegistry for InMemoryConnectionRegistry {
    async fn register(&self, connection_id: String, sender: mpsc::UnboundedSender<String>) {
        let mut connections = self.connections.write().await;
        connections.insert(
            connection_id,
            ConnectionEntry {
                sender,
                attributes: None,
            },
        );
    }

    async fn set_attributes(&self, connection_id: &str, location_id: &str, display_name: &str) {
        let mut connections = self.connections.write().await;
        if let Some(entry) = connections.get_mut(connection_id) {
            entry.attributes = Some(ConnectionAttributes {
                location_id: location_id.to_string(),
                display_name: display_name.to_string(),
            });
        } else {
            debug!(connection_id = %connection_id, "Attributes for unknown connection ignored");
        }
    }

    async fn attributes(&self, connection_id: &str) -> Option<ConnectionAttributes> {
        let connections = self.connections.read().await;
        connections
            .get(connection_id)
            .and_then(|entry| entry.attributes.clone())
    }

    async fn is_live(&self, connection_id: &str) -> bool {
        let connections = self.connections.read().await;
        connections.contains_key(connection_id)
    }

    async fn deliver(&self, connection_id: &str, message: &WebSocketMessage) {
        let raw = match serde_json::to_string(message) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(connection_id = %connection_id, error = %e, "Failed to serialize outbound message");
                return;
            }
        };

        let connections = self.connections.read().await;
        if let Some(entry) = connections.get(connection_id) {
            // The receive side may have shut down mid-send; that is the
            // same as the connection being gone.
            let _ = entry.sender.send(raw);
        }
    }

    async fn remove(&self, connection_id: &str) {
        let mut connections = self.connections.write().await;
        connections.remove(connection_id);
    }
}

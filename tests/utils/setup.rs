use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use shareorsteal::connection::{ConnectionRegistry, InMemoryConnectionRegistry};
use shareorsteal::eligibility::{EligibilityGate, InMemoryEligibilityGate};
use shareorsteal::game::{Decision, EngineConfig, MatchEngine};
use shareorsteal::queue::LocationQueues;
use shareorsteal::websockets::WebSocketMessage;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub const LOCATION: &str = "L1";

/// A fully wired matchmaking core with real in-memory dependencies.
///
/// Each "player" is a registered connection whose outbound channel receiver
/// is kept here as an inbox, so tests can drain and inspect exactly what the
/// server pushed to each side.
pub struct TestSetup {
    pub registry: Arc<InMemoryConnectionRegistry>,
    pub queues: Arc<LocationQueues>,
    pub engine: Arc<MatchEngine>,
    pub gate: Arc<dyn EligibilityGate>,
    inboxes: HashMap<String, mpsc::UnboundedReceiver<String>>,
}

pub struct TestSetupBuilder {
    config: EngineConfig,
    gate: Option<Arc<dyn EligibilityGate>>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            gate: None,
        }
    }

    /// Shrink the decision window so timeout paths run in test time.
    pub fn with_decision_window(mut self, window: Duration, grace: Duration) -> Self {
        self.config = EngineConfig {
            decision_window: window,
            grace_period: grace,
        };
        self
    }

    pub fn with_gate(mut self, gate: Arc<dyn EligibilityGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn build(self) -> TestSetup {
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let queues = Arc::new(LocationQueues::new(registry.clone()));
        let gate = self
            .gate
            .unwrap_or_else(|| Arc::new(InMemoryEligibilityGate::new()));
        let engine = Arc::new(MatchEngine::new(
            queues.clone(),
            registry.clone(),
            gate.clone(),
            self.config,
        ));

        TestSetup {
            registry,
            queues,
            engine,
            gate,
            inboxes: HashMap::new(),
        }
    }
}

impl Default for TestSetupBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSetup {
    /// Registers a transport session for `connection_id` and keeps its
    /// outbound receiver as an inbox.
    pub async fn connect(&mut self, connection_id: &str) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.registry.register(connection_id.to_string(), tx).await;
        self.inboxes.insert(connection_id.to_string(), rx);
    }

    pub async fn join(&self, connection_id: &str, display_name: &str) {
        self.engine
            .join_location(connection_id, LOCATION, display_name)
            .await;
    }

    pub async fn join_at(&self, connection_id: &str, location_id: &str, display_name: &str) {
        self.engine
            .join_location(connection_id, location_id, display_name)
            .await;
    }

    pub async fn submit(&self, connection_id: &str, match_id: &str, decision: Decision) {
        self.engine
            .submit_choice(connection_id, match_id, decision)
            .await;
    }

    /// Full transport loss: registry purge followed by the engine's
    /// disconnect handling, the same order the gateway teardown uses.
    pub async fn disconnect(&mut self, connection_id: &str) {
        self.registry.remove(connection_id).await;
        self.inboxes.remove(connection_id);
        self.engine.handle_disconnect(connection_id).await;
    }

    /// Registry-only removal, simulating the race where a queue entry
    /// outlives its transport (no disconnect sweep has run yet).
    pub async fn drop_transport(&mut self, connection_id: &str) {
        self.registry.remove(connection_id).await;
        self.inboxes.remove(connection_id);
    }

    /// Everything pushed to this connection since the last drain.
    pub fn drain(&mut self, connection_id: &str) -> Vec<WebSocketMessage> {
        let rx = self
            .inboxes
            .get_mut(connection_id)
            .expect("connection was never connected");
        let mut messages = Vec::new();
        while let Ok(raw) = rx.try_recv() {
            messages.push(serde_json::from_str(&raw).expect("outbound messages are valid JSON"));
        }
        messages
    }
}

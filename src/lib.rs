// Library crate for the Share or Steal matchmaking server
// This file exposes the public API for integration tests

pub mod connection;
pub mod eligibility;
pub mod game;
pub mod queue;
pub mod shared;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use connection::{ConnectionRegistry, InMemoryConnectionRegistry};
pub use eligibility::{EligibilityGate, InMemoryEligibilityGate};
pub use game::{Decision, EngineConfig, MatchEngine};
pub use queue::{JoinOutcome, LocationQueues};
pub use shared::{AppError, AppState};
pub use websockets::{InboundRouter, MessageType, WebSocketMessage};

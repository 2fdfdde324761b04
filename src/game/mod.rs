// Public API
pub use engine::MatchEngine;
pub use models::{Decision, EngineConfig, MatchRecord, Participant, Side};
pub use outcome::{resolve, Outcome, OutcomeCategory};

// Internal modules
mod engine;
pub mod models;
pub mod outcome;

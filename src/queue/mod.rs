// Public API - what other modules can use
pub use manager::{JoinOutcome, LocationQueues};

// Internal modules
mod manager;

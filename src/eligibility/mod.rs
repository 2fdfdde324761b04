// Public API - what other modules can use
pub use gate::{EligibilityGate, InMemoryEligibilityGate};

// Internal modules
mod gate;

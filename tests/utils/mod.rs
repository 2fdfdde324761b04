pub mod assertions;
pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use mocks::FailingEligibilityGate;
#[allow(unused_imports)]
pub use setup::{TestSetup, TestSetupBuilder, LOCATION};

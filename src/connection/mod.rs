// Public API - what other modules can use
pub use registry::{ConnectionAttributes, ConnectionRegistry, InMemoryConnectionRegistry};

// Internal modules
mod registry;

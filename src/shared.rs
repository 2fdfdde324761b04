use std::sync::Arc;
use thiserror::Error;

use crate::connection::ConnectionRegistry;
use crate::game::MatchEngine;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<dyn ConnectionRegistry>,
    pub engine: Arc<MatchEngine>,
}

impl AppState {
    pub fn new(registry: Arc<dyn ConnectionRegistry>, engine: Arc<MatchEngine>) -> Self {
        Self { registry, engine }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Eligibility gate unavailable: {0}")]
    GateUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

use async_trait::async_trait;

use shareorsteal::eligibility::EligibilityGate;
use shareorsteal::shared::AppError;

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Eligibility gate whose backend is down. The core must treat every
/// failure as "gate absent" and keep the round moving.
pub struct FailingEligibilityGate;

#[async_trait]
impl EligibilityGate for FailingEligibilityGate {
    async fn may_play_today(&self, _device_id: &str) -> Result<bool, AppError> {
        Err(AppError::GateUnavailable("gate backend offline".to_string()))
    }

    async fn record_played(&self, _device_id: &str) -> Result<(), AppError> {
        Err(AppError::Internal)
    }
}

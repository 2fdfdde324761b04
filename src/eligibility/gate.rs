use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use std::collections::HashSet;
use tokio::sync::Mutex;
use tracing::debug;

use crate::shared::AppError;

/// Daily-play gate: one round per device per calendar day.
///
/// Day keys are computed in a fixed reference time zone so "today" does
/// not drift with wherever the server happens to run. The gate is an
/// external collaborator from the engine's point of view: the engine asks
/// the query on join, issues the record command at finalize, and tolerates
/// the gate being unavailable for either.
#[async_trait]
pub trait EligibilityGate: Send + Sync {
    /// Whether this device may start a new round today.
    async fn may_play_today(&self, device_id: &str) -> Result<bool, AppError>;

    /// Records that this device played today.
    async fn record_played(&self, device_id: &str) -> Result<(), AppError>;
}

/// In-memory implementation of EligibilityGate for development and testing
pub struct InMemoryEligibilityGate {
    played: Mutex<HashSet<(String, NaiveDate)>>,
    reference_offset: FixedOffset,
}

impl InMemoryEligibilityGate {
    /// Gate keyed on UTC calendar days.
    pub fn new() -> Self {
        Self::with_offset(Utc.fix())
    }

    /// Gate keyed on calendar days at a fixed offset, for venues pinned to
    /// a local day boundary.
    pub fn with_offset(reference_offset: FixedOffset) -> Self {
        Self {
            played: Mutex::new(HashSet::new()),
            reference_offset,
        }
    }

    fn day_key(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.reference_offset).date_naive()
    }
}

impl Default for InMemoryEligibilityGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EligibilityGate for InMemoryEligibilityGate {
    async fn may_play_today(&self, device_id: &str) -> Result<bool, AppError> {
        let played = self.played.lock().await;
        Ok(!played.contains(&(device_id.to_string(), self.day_key())))
    }

    async fn record_played(&self, device_id: &str) -> Result<(), AppError> {
        let day = self.day_key();
        debug!(device_id = %device_id, day = %day, "Recording play");
        let mut played = self.played.lock().await;
        played.insert((device_id.to_string(), day));
        Ok(())
    }
}

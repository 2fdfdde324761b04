use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum_macros::EnumIter;
use tokio::task::AbortHandle;

/// A participant's decision. These are the only two legal values; anything
/// else on the wire is dropped before it reaches the engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Share,
    Steal,
}

/// Display-only side labels assigned at pairing time. The game is
/// symmetric; side A is simply the participant that queued first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }
}

/// One side of a match, snapshotted at pairing time.
#[derive(Debug, Clone)]
pub struct Participant {
    pub connection_id: String,
    pub display_name: String,
    pub decision: Option<Decision>,
}

impl Participant {
    pub fn new(connection_id: String, display_name: String) -> Self {
        Self {
            connection_id,
            display_name,
            decision: None,
        }
    }
}

/// A live match.
///
/// A record sits in the engine's match table for strictly the interval
/// between creation and finalization or cancellation, and a connection
/// participates in at most one live match at a time.
pub struct MatchRecord {
    pub id: String,
    pub location_id: String,
    /// Indexed by `Side::index()`: side A first, side B second.
    pub participants: [Participant; 2],
    pub deadline: DateTime<Utc>,
    /// Terminal flag; doubles as the guard against double-finalization.
    pub finished: bool,
    /// Pending finalize timer, aborted exactly once on finalize or cancel.
    pub timer: Option<AbortHandle>,
}

impl MatchRecord {
    pub fn side_of(&self, connection_id: &str) -> Option<Side> {
        if self.participants[0].connection_id == connection_id {
            Some(Side::A)
        } else if self.participants[1].connection_id == connection_id {
            Some(Side::B)
        } else {
            None
        }
    }

    pub fn participant(&self, side: Side) -> &Participant {
        &self.participants[side.index()]
    }

    pub fn participant_mut(&mut self, side: Side) -> &mut Participant {
        &mut self.participants[side.index()]
    }
}

/// Timing knobs for the decision state machine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long both sides have to submit after the match is created.
    pub decision_window: Duration,
    /// Slack after the window before the timer force-checks finalization,
    /// tolerating scheduling jitter.
    pub grace_period: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            decision_window: Duration::from_millis(20_000),
            grace_period: Duration::from_millis(250),
        }
    }
}

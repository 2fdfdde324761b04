use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::Decision;

/// Message types for WebSocket communication
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    // Client -> Server
    JoinLocation,
    SubmitChoice,

    // Server -> Client
    Queued,
    MatchFound,
    ChoiceRecorded,
    Result,
    Requeue,
    Error,
}

/// Metadata for WebSocket messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketMessageMeta {
    pub timestamp: DateTime<Utc>,
}

/// Base structure for WebSocket messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketMessage {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub payload: serde_json::Value,
    pub meta: Option<WebSocketMessageMeta>,
}

/// Client-to-Server message payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinLocationPayload {
    pub location_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitChoicePayload {
    pub match_id: String,
    pub choice: Decision,
}

/// Server-to-Client message payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedPayload {
    /// 1-based position in the location's queue
    pub position: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpponentInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFoundPayload {
    pub match_id: String,
    pub opponent: OpponentInfo,
    /// Absolute decision deadline, epoch milliseconds
    pub decision_deadline: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceRecordedPayload {
    pub match_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPayload {
    pub match_id: String,
    pub your_choice: Decision,
    pub their_choice: Decision,
    /// `null` on the wire when this side won nothing
    pub your_prize_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequeuePayload {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// Helper functions for creating messages
impl WebSocketMessage {
    pub fn new(message_type: MessageType, payload: serde_json::Value) -> Self {
        Self {
            message_type,
            payload,
            meta: Some(WebSocketMessageMeta {
                timestamp: Utc::now(),
            }),
        }
    }

    /// Create a join_location message
    pub fn join_location(location_id: String, player_name: Option<String>) -> Self {
        let payload = JoinLocationPayload {
            location_id,
            player_name,
        };
        Self::new(
            MessageType::JoinLocation,
            serde_json::to_value(payload).unwrap(),
        )
    }

    /// Create a submit_choice message
    pub fn submit_choice(match_id: String, choice: Decision) -> Self {
        let payload = SubmitChoicePayload { match_id, choice };
        Self::new(
            MessageType::SubmitChoice,
            serde_json::to_value(payload).unwrap(),
        )
    }

    /// Create a queued message
    pub fn queued(position: usize) -> Self {
        let payload = QueuedPayload { position };
        Self::new(MessageType::Queued, serde_json::to_value(payload).unwrap())
    }

    /// Create a match_found message
    pub fn match_found(
        match_id: &str,
        opponent_id: &str,
        opponent_name: &str,
        deadline: DateTime<Utc>,
    ) -> Self {
        let payload = MatchFoundPayload {
            match_id: match_id.to_string(),
            opponent: OpponentInfo {
                id: opponent_id.to_string(),
                name: opponent_name.to_string(),
            },
            decision_deadline: deadline.timestamp_millis(),
        };
        Self::new(
            MessageType::MatchFound,
            serde_json::to_value(payload).unwrap(),
        )
    }

    /// Create a choice_recorded message
    pub fn choice_recorded(match_id: &str) -> Self {
        let payload = ChoiceRecordedPayload {
            match_id: match_id.to_string(),
        };
        Self::new(
            MessageType::ChoiceRecorded,
            serde_json::to_value(payload).unwrap(),
        )
    }

    /// Create a result message
    pub fn result(
        match_id: &str,
        your_choice: Decision,
        their_choice: Decision,
        your_prize_code: Option<String>,
    ) -> Self {
        let payload = ResultPayload {
            match_id: match_id.to_string(),
            your_choice,
            their_choice,
            your_prize_code,
        };
        Self::new(MessageType::Result, serde_json::to_value(payload).unwrap())
    }

    /// Create a requeue message
    pub fn requeue(reason: &str) -> Self {
        let payload = RequeuePayload {
            reason: reason.to_string(),
        };
        Self::new(MessageType::Requeue, serde_json::to_value(payload).unwrap())
    }

    /// Create an error message
    pub fn error(message: String) -> Self {
        let payload = ErrorPayload { message };
        Self::new(MessageType::Error, serde_json::to_value(payload).unwrap())
    }
}

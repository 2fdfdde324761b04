use async_trait::async_trait;
use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::MatchEngine;
use crate::shared::AppState;
use crate::websockets::messages::{
    JoinLocationPayload, MessageType, SubmitChoicePayload, WebSocketMessage,
};

use super::socket::{ClientConnection, MessageHandler};

/// Routes inbound frames from a connection to the matchmaking core
pub struct InboundRouter {
    engine: Arc<MatchEngine>,
}

impl InboundRouter {
    pub fn new(engine: Arc<MatchEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl MessageHandler for InboundRouter {
    async fn handle_message(&self, connection_id: &str, message: String) {
        let ws_message = match serde_json::from_str::<WebSocketMessage>(&message) {
            Ok(ws_message) => ws_message,
            Err(e) => {
                warn!(
                    connection_id = %connection_id,
                    error = %e,
                    "Failed to parse WebSocket message"
                );
                return;
            }
        };

        match ws_message.message_type {
            MessageType::JoinLocation => {
                match serde_json::from_value::<JoinLocationPayload>(ws_message.payload) {
                    Ok(payload) => {
                        let display_name = payload
                            .player_name
                            .filter(|name| !name.trim().is_empty())
                            .unwrap_or_else(placeholder_name);
                        self.engine
                            .join_location(connection_id, &payload.location_id, &display_name)
                            .await;
                    }
                    Err(e) => {
                        warn!(
                            connection_id = %connection_id,
                            error = %e,
                            "Invalid join_location payload"
                        );
                    }
                }
            }
            MessageType::SubmitChoice => {
                match serde_json::from_value::<SubmitChoicePayload>(ws_message.payload) {
                    Ok(payload) => {
                        self.engine
                            .submit_choice(connection_id, &payload.match_id, payload.choice)
                            .await;
                    }
                    // Covers non-enumerated choice values: dropped with no
                    // acknowledgment at all.
                    Err(e) => {
                        debug!(
                            connection_id = %connection_id,
                            error = %e,
                            "Dropped submit_choice with invalid payload"
                        );
                    }
                }
            }
            other => {
                debug!(
                    message_type = ?other,
                    "Unhandled message type"
                );
            }
        }
    }
}

/// Placeholder display name for players who join without one
fn placeholder_name() -> String {
    petname::Petnames::default().generate_one(2, "-")
}

/// WebSocket endpoint: GET /ws
///
/// Connections are anonymous; each transport session gets a fresh opaque
/// identifier. Location and display name arrive with the join_location
/// message, not at upgrade time.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(app_state): State<AppState>) -> Response {
    let connection_id = Uuid::new_v4().to_string();
    info!(connection_id = %connection_id, "WebSocket connection requested");
    ws.on_upgrade(move |socket| handle_websocket_connection(socket, connection_id, app_state))
}

/// Handle the upgraded WebSocket connection
async fn handle_websocket_connection(
    socket: axum::extract::ws::WebSocket,
    connection_id: String,
    app_state: AppState,
) {
    info!(connection_id = %connection_id, "WebSocket connection established");

    // Outbound channel (app -> client), registered so the rest of the
    // system can deliver to this connection
    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel::<String>();
    app_state
        .registry
        .register(connection_id.clone(), outbound_sender)
        .await;

    let message_handler = Arc::new(InboundRouter::new(app_state.engine.clone()));
    let connection = ClientConnection::new(
        connection_id.clone(),
        Box::new(socket),
        outbound_receiver,
        message_handler,
    );

    // Run the connection until disconnect
    match connection.run().await {
        Ok(()) => {
            info!(connection_id = %connection_id, "WebSocket connection closed cleanly");
        }
        Err(e) => {
            warn!(
                connection_id = %connection_id,
                error = ?e,
                "WebSocket connection error"
            );
        }
    }

    // The registry entry goes first, so any pairing attempt that races the
    // teardown sees this connection as gone; then the engine sweeps the
    // queues and cancels its active match.
    app_state.registry.remove(&connection_id).await;
    app_state.engine.handle_disconnect(&connection_id).await;

    info!(connection_id = %connection_id, "WebSocket disconnect handled");
}

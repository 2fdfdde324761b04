//! Test assertion helpers for inspecting drained messages
#![allow(dead_code)] // Test utilities may not all be used in every test

use serde::de::DeserializeOwned;

use shareorsteal::websockets::{MessageType, WebSocketMessage};

// ============================================================================
// Assertion Helpers
// ============================================================================

/// All messages of one type, in delivery order.
pub fn of_type(messages: &[WebSocketMessage], message_type: MessageType) -> Vec<WebSocketMessage> {
    messages
        .iter()
        .filter(|m| m.message_type == message_type)
        .cloned()
        .collect()
}

/// Exactly one message of the given type.
pub fn single_of_type(messages: &[WebSocketMessage], message_type: MessageType) -> WebSocketMessage {
    let matching = of_type(messages, message_type.clone());
    assert_eq!(
        matching.len(),
        1,
        "expected exactly one {:?} message, got {} in {:?}",
        message_type,
        matching.len(),
        messages
    );
    matching.into_iter().next().unwrap()
}

/// No message of the given type was delivered.
pub fn none_of_type(messages: &[WebSocketMessage], message_type: MessageType) {
    assert!(
        !messages.iter().any(|m| m.message_type == message_type),
        "expected no {:?} message in {:?}",
        message_type,
        messages
    );
}

/// Typed view of a message's payload.
pub fn payload<T: DeserializeOwned>(message: &WebSocketMessage) -> T {
    serde_json::from_value(message.payload.clone()).expect("payload matches expected shape")
}

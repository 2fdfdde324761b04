// Public API
pub use handler::{websocket_handler, InboundRouter};
pub use messages::{MessageType, WebSocketMessage};
pub use socket::{ClientConnection, MessageHandler, SocketWrapper};

// Internal modules
mod handler;
pub mod messages;
mod socket;

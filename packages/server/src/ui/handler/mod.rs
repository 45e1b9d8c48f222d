//! Request handlers.

mod credential;
mod http;
mod websocket;

pub use http::{get_recent_messages, health_check, list_conversations};
pub use websocket::websocket_handler;

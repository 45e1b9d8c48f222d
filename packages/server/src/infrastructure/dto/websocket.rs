//! WebSocket frame DTOs.

use serde::{Deserialize, Serialize};

/// Inbound frame sent by a client: one logical send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientEnvelope {
    pub to: String,
    pub message: String,
}

/// Outbound frame, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    /// Pushed to the recipient
    Message {
        from: String,
        message: String,
        timestamp: i64,
    },
    /// Acknowledgment to the sender
    Sent {
        to: String,
        message: String,
        timestamp: i64,
    },
    /// Human-readable error for the sender
    Error { detail: String },
}

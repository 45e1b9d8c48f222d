//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// One entry of the conversation list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummaryDto {
    pub peer: String,
    pub peer_display_name: String,
    pub peer_avatar: Option<String>,
    pub last_message: String,
    /// RFC 3339 format
    pub last_message_time: String,
    /// RFC 3339 format
    pub created_at: String,
}

/// One message of a conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDto {
    pub sender: String,
    pub receiver: String,
    pub body: String,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    /// RFC 3339 format
    pub sent_at: String,
}

/// Error body returned by the HTTP API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDto {
    pub detail: String,
}

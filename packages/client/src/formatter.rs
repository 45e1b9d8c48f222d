//! Frame formatting utilities for client display.

use hanashi_server::infrastructure::dto::websocket::ServerFrame;
use hanashi_shared::time::timestamp_to_rfc3339;

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format one server frame
    pub fn format_frame(frame: &ServerFrame) -> String {
        match frame {
            ServerFrame::Message {
                from,
                message,
                timestamp,
            } => Self::format_incoming_message(from, message, *timestamp),
            ServerFrame::Sent { to, timestamp, .. } => {
                Self::format_sent_confirmation(to, *timestamp)
            }
            ServerFrame::Error { detail } => Self::format_error(detail),
        }
    }

    /// Format a message pushed by another user
    pub fn format_incoming_message(from: &str, message: &str, timestamp: i64) -> String {
        format!(
            "\n\n------------------------------------------------------------\n\
             @{}: {}\n\
             sent at {}\n\
             ------------------------------------------------------------\n",
            from,
            message,
            timestamp_to_rfc3339(timestamp)
        )
    }

    /// Format the acknowledgment of our own message
    pub fn format_sent_confirmation(to: &str, timestamp: i64) -> String {
        format!("\nsent to {} at {}\n", to, timestamp_to_rfc3339(timestamp))
    }

    pub fn format_error(detail: &str) -> String {
        format!("\n! {}\n", detail)
    }

    /// Format a local notice (not from the server)
    pub fn format_notice(text: &str) -> String {
        format!("{}\n", text)
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }
}

//! Conversion logic between DTOs and domain entities.

use hanashi_shared::time::timestamp_to_rfc3339;

use crate::domain::{ConversationSummary, Envelope, Message, OutboundEvent};
use crate::infrastructure::dto::{http, websocket as dto};

// ========================================
// DTO → Domain Entity
// ========================================

impl From<dto::ClientEnvelope> for Envelope {
    fn from(dto: dto::ClientEnvelope) -> Self {
        Self {
            to: dto.to,
            message: dto.message,
        }
    }
}

// ========================================
// Domain Entity → DTO
// ========================================

impl From<OutboundEvent> for dto::ServerFrame {
    fn from(event: OutboundEvent) -> Self {
        match event {
            OutboundEvent::Message {
                from,
                body,
                timestamp,
            } => Self::Message {
                from: from.into_string(),
                message: body.into_string(),
                timestamp: timestamp.value(),
            },
            OutboundEvent::Sent {
                to,
                body,
                timestamp,
            } => Self::Sent {
                to: to.into_string(),
                message: body.into_string(),
                timestamp: timestamp.value(),
            },
            OutboundEvent::Error { detail } => Self::Error { detail },
        }
    }
}

impl From<ConversationSummary> for http::ConversationSummaryDto {
    fn from(model: ConversationSummary) -> Self {
        Self {
            peer: model.peer.into_string(),
            peer_display_name: model.peer_display_name,
            peer_avatar: model.peer_avatar,
            last_message: model.last_message,
            last_message_time: timestamp_to_rfc3339(model.last_message_time.value()),
            created_at: timestamp_to_rfc3339(model.created_at.value()),
        }
    }
}

impl From<Message> for http::MessageDto {
    fn from(model: Message) -> Self {
        Self {
            sender: model.sender.into_string(),
            receiver: model.receiver.into_string(),
            body: model.body.into_string(),
            timestamp: model.timestamp.value(),
            sent_at: timestamp_to_rfc3339(model.timestamp.value()),
        }
    }
}

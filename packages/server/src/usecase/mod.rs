//! UseCase 層
//!
//! 接続・切断・メッセージ送信（ルーティング）・参照系の各ユースケースを提供します。

mod connect_user;
mod disconnect_user;
mod error;
mod get_recent_messages;
mod list_conversations;
mod send_message;

pub use connect_user::{ConnectUserUseCase, ConnectedUser};
pub use disconnect_user::{DisconnectOutcome, DisconnectUserUseCase};
pub use error::{ConnectError, QueryError, SendMessageError};
pub use get_recent_messages::{DEFAULT_HISTORY_LIMIT, GetRecentMessagesUseCase};
pub use list_conversations::ListConversationsUseCase;
pub use send_message::{
    DeliveryOutcome, RECIPIENT_OFFLINE_DETAIL, RouteReport, SendMessageUseCase, sender_events,
};

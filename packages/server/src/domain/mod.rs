//! ドメイン層
//!
//! 1:1 メッセージングのビジネスルールと、外部依存（永続化・認証・接続管理）の
//! インターフェース（ポート）を定義します。具体的な実装は Infrastructure 層が提供します。

pub mod entity;
pub mod error;
pub mod identity;
pub mod registry;
pub mod repository;
pub mod value_object;

pub use entity::{
    ConversationSummary, Envelope, Message, OutboundEvent, SummaryUpdate, UserProfile,
};
pub use error::{AuthError, MessagePushError, RepositoryError, ValueObjectError};
pub use identity::IdentityVerifier;
pub use registry::{Connection, ConnectionRegistry, PusherChannel, Registration};
pub use repository::{ConversationRepository, MessageRepository, ProfileRepository};
pub use value_object::{ConnectionId, MessageBody, Timestamp, UserId};

//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! - `MessageRepository`: 送信済みメッセージの追記専用ログ
//! - `ConversationRepository`: ユーザーごとの会話サマリー（upsert のみ）
//! - `ProfileRepository`: 会話サマリーに載せる表示名・アバター

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::{ConversationSummary, Message, RepositoryError, SummaryUpdate, UserId, UserProfile};

/// Message Repository trait
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// メッセージを追記する
    async fn append(&self, message: &Message) -> Result<(), RepositoryError>;

    /// 2 ユーザー間の最新 `limit` 件を古い順に返す（どちら向きのメッセージも含む）
    async fn recent_messages(
        &self,
        user_a: &UserId,
        user_b: &UserId,
        limit: usize,
    ) -> Result<Vec<Message>, RepositoryError>;
}

/// Conversation Repository trait
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// `(owner, peer)` の会話サマリーを作成または更新する
    ///
    /// `(owner, peer)` 単位でアトミックであること（read-then-write での実装は不可）。
    /// 既存行より古い `last_message_time` での更新は無視される。
    async fn upsert_summary(&self, update: &SummaryUpdate) -> Result<(), RepositoryError>;

    /// `owner` の会話サマリーを `last_message_time` の降順で返す
    async fn list_summaries(&self, owner: &UserId)
    -> Result<Vec<ConversationSummary>, RepositoryError>;
}

/// Profile Repository trait
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// プロフィールを取得する（未登録なら `None`）
    async fn find_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, RepositoryError>;
}

//! UseCase: 2 ユーザー間の直近メッセージの取得

use std::sync::Arc;

use crate::domain::{Message, MessageRepository, UserId};

use super::error::QueryError;

/// `limit` 未指定時の取得件数
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// 直近メッセージ取得のユースケース
pub struct GetRecentMessagesUseCase {
    messages: Arc<dyn MessageRepository>,
    /// 1 回の取得で返す最大件数
    max_limit: usize,
}

impl GetRecentMessagesUseCase {
    pub fn new(messages: Arc<dyn MessageRepository>, max_limit: usize) -> Self {
        Self {
            messages,
            max_limit: max_limit.max(1),
        }
    }

    /// `user` と `peer` の間の最新メッセージを古い順に返す
    ///
    /// `limit` は 1 以上 `max_limit` 以下に丸められる。
    pub async fn execute(
        &self,
        user: &UserId,
        peer: String,
        limit: Option<usize>,
    ) -> Result<Vec<Message>, QueryError> {
        let peer = UserId::new(peer).map_err(|e| QueryError::InvalidPeer(e.to_string()))?;
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, self.max_limit);

        let messages = self.messages.recent_messages(user, &peer, limit).await?;
        Ok(messages)
    }
}

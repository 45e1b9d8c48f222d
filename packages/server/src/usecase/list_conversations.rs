//! UseCase: 会話一覧の取得

use std::sync::Arc;

use crate::domain::{ConversationRepository, ConversationSummary, UserId};

use super::error::QueryError;

/// 会話一覧取得のユースケース
pub struct ListConversationsUseCase {
    conversations: Arc<dyn ConversationRepository>,
}

impl ListConversationsUseCase {
    pub fn new(conversations: Arc<dyn ConversationRepository>) -> Self {
        Self { conversations }
    }

    /// `owner` の会話サマリーを最新メッセージ時刻の降順で返す
    pub async fn execute(&self, owner: &UserId) -> Result<Vec<ConversationSummary>, QueryError> {
        let summaries = self.conversations.list_summaries(owner).await?;
        tracing::debug!("Listed {} conversations of '{}'", summaries.len(), owner);
        Ok(summaries)
    }
}

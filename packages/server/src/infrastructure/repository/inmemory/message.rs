//! InMemory Message Repository 実装

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Message, MessageRepository, RepositoryError, UserId};

/// 追記専用のインメモリメッセージログ
#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: Mutex<Vec<Message>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存済みメッセージの件数
    pub async fn count(&self) -> usize {
        self.messages.lock().await.len()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn append(&self, message: &Message) -> Result<(), RepositoryError> {
        self.messages.lock().await.push(message.clone());
        Ok(())
    }

    async fn recent_messages(
        &self,
        user_a: &UserId,
        user_b: &UserId,
        limit: usize,
    ) -> Result<Vec<Message>, RepositoryError> {
        let messages = self.messages.lock().await;
        let mut recent: Vec<Message> = messages
            .iter()
            .rev()
            .filter(|m| {
                (&m.sender == user_a && &m.receiver == user_b)
                    || (&m.sender == user_b && &m.receiver == user_a)
            })
            .take(limit)
            .cloned()
            .collect();
        recent.reverse();
        Ok(recent)
    }
}

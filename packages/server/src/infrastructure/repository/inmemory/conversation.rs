//! InMemory Conversation Repository 実装
//!
//! `(owner, peer)` をキーにした HashMap を 1 つの Mutex で守ることで、
//! upsert を `(owner, peer)` 単位でアトミックにしています。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ConversationRepository, ConversationSummary, RepositoryError, SummaryUpdate, UserId,
};

#[derive(Default)]
pub struct InMemoryConversationRepository {
    summaries: Mutex<HashMap<(UserId, UserId), ConversationSummary>>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn upsert_summary(&self, update: &SummaryUpdate) -> Result<(), RepositoryError> {
        let mut summaries = self.summaries.lock().await;
        let key = (update.owner.clone(), update.peer.clone());

        match summaries.get_mut(&key) {
            Some(existing) => {
                if update.last_message_time >= existing.last_message_time {
                    existing.last_message = update.last_message.clone();
                    existing.last_message_time = update.last_message_time;
                }
            }
            None => {
                summaries.insert(
                    key,
                    ConversationSummary {
                        owner: update.owner.clone(),
                        peer: update.peer.clone(),
                        peer_display_name: update.peer_display_name.clone(),
                        peer_avatar: update.peer_avatar.clone(),
                        last_message: update.last_message.clone(),
                        last_message_time: update.last_message_time,
                        created_at: update.last_message_time,
                    },
                );
            }
        }
        Ok(())
    }

    async fn list_summaries(
        &self,
        owner: &UserId,
    ) -> Result<Vec<ConversationSummary>, RepositoryError> {
        let summaries = self.summaries.lock().await;
        let mut result: Vec<ConversationSummary> = summaries
            .values()
            .filter(|s| &s.owner == owner)
            .cloned()
            .collect();
        result.sort_by(|a, b| {
            b.last_message_time
                .cmp(&a.last_message_time)
                .then_with(|| a.peer.cmp(&b.peer))
        });
        Ok(result)
    }
}

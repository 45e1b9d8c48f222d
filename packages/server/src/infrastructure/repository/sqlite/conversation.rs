//! SQLite Conversation Repository 実装
//!
//! upsert は `INSERT .. ON CONFLICT(owner, peer) DO UPDATE` の 1 文で行うため、
//! 同じ 2 ユーザー間で並行してメッセージが送られても更新が失われない。

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::{
    ConversationRepository, ConversationSummary, RepositoryError, SummaryUpdate, Timestamp, UserId,
};

use super::storage_error;

pub struct SqliteConversationRepository {
    pool: SqlitePool,
}

impl SqliteConversationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

type SummaryRow = (String, String, String, Option<String>, String, i64, i64);

#[async_trait]
impl ConversationRepository for SqliteConversationRepository {
    async fn upsert_summary(&self, update: &SummaryUpdate) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO conversations
                (owner, peer, peer_display_name, peer_avatar, last_message, last_message_time, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT (owner, peer) DO UPDATE SET
                last_message = excluded.last_message,
                last_message_time = excluded.last_message_time
             WHERE excluded.last_message_time >= conversations.last_message_time",
        )
        .bind(update.owner.as_str())
        .bind(update.peer.as_str())
        .bind(update.peer_display_name.as_str())
        .bind(update.peer_avatar.as_deref())
        .bind(update.last_message.as_str())
        .bind(update.last_message_time.value())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn list_summaries(
        &self,
        owner: &UserId,
    ) -> Result<Vec<ConversationSummary>, RepositoryError> {
        let rows: Vec<SummaryRow> = sqlx::query_as(
            "SELECT owner, peer, peer_display_name, peer_avatar, last_message, last_message_time, created_at
             FROM conversations
             WHERE owner = ?1
             ORDER BY last_message_time DESC, peer ASC",
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter()
            .map(
                |(owner, peer, peer_display_name, peer_avatar, last_message, last_time, created_at)| {
                    let corrupted =
                        |e: crate::domain::ValueObjectError| RepositoryError::CorruptedRecord(e.to_string());
                    Ok(ConversationSummary {
                        owner: UserId::new(owner).map_err(corrupted)?,
                        peer: UserId::new(peer).map_err(corrupted)?,
                        peer_display_name,
                        peer_avatar,
                        last_message,
                        last_message_time: Timestamp::new(last_time),
                        created_at: Timestamp::new(created_at),
                    })
                },
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repository::sqlite::connect;

    fn user(name: &str) -> UserId {
        UserId::new(name.to_string()).unwrap()
    }

    fn update(owner: &str, peer: &str, text: &str, at: i64) -> SummaryUpdate {
        SummaryUpdate {
            owner: user(owner),
            peer: user(peer),
            peer_display_name: format!("{peer} (display)"),
            peer_avatar: Some(format!("/avatars/{peer}.png")),
            last_message: text.to_string(),
            last_message_time: Timestamp::new(at),
        }
    }

    #[tokio::test]
    async fn test_upsert_keeps_single_row_per_pair() {
        // テスト項目: 連続した upsert でも (owner, peer) ごとに 1 行で、最新の内容になる
        // given (前提条件):
        let repo = SqliteConversationRepository::new(connect("sqlite::memory:").await.unwrap());
        repo.upsert_summary(&update("alice", "bob", "first", 10))
            .await
            .unwrap();

        // when (操作):
        repo.upsert_summary(&update("alice", "bob", "second", 20))
            .await
            .unwrap();
        repo.upsert_summary(&update("alice", "bob", "stale", 15))
            .await
            .unwrap();

        // then (期待する結果):
        let summaries = repo.list_summaries(&user("alice")).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].last_message, "second");
        assert_eq!(summaries[0].last_message_time, Timestamp::new(20));
        assert_eq!(summaries[0].created_at, Timestamp::new(10));
        assert_eq!(summaries[0].peer_display_name, "bob (display)");
        assert_eq!(summaries[0].peer_avatar.as_deref(), Some("/avatars/bob.png"));
    }

    #[tokio::test]
    async fn test_list_summaries_order() {
        // テスト項目: 会話一覧が最終メッセージ時刻の降順で返される
        // given (前提条件):
        let repo = SqliteConversationRepository::new(connect("sqlite::memory:").await.unwrap());
        repo.upsert_summary(&update("alice", "bob", "b", 10))
            .await
            .unwrap();
        repo.upsert_summary(&update("alice", "charlie", "c", 30))
            .await
            .unwrap();

        // when (操作):
        let summaries = repo.list_summaries(&user("alice")).await.unwrap();

        // then (期待する結果):
        let peers: Vec<&str> = summaries.iter().map(|s| s.peer.as_str()).collect();
        assert_eq!(peers, vec!["charlie", "bob"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_on_file_database() {
        // テスト項目: 複数接続のプールから同じ (owner, peer) へ並行 upsert しても 1 行で、最新時刻の内容が残る
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("hanashi.db").display());
        let repo = std::sync::Arc::new(SqliteConversationRepository::new(
            connect(&url).await.unwrap(),
        ));

        // when (操作):
        let handles: Vec<_> = (1..=40)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.upsert_summary(&update("alice", "bob", &format!("m{i}"), i))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        // then (期待する結果):
        let summaries = repo.list_summaries(&user("alice")).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].last_message, "m40");
        assert_eq!(summaries[0].last_message_time, Timestamp::new(40));
    }
}

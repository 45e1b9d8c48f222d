//! SQLite Message Repository 実装

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::{Message, MessageBody, MessageRepository, RepositoryError, Timestamp, UserId};

use super::storage_error;

pub struct SqliteMessageRepository {
    pool: SqlitePool,
}

impl SqliteMessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

type MessageRow = (String, String, String, i64);

fn into_message((sender, receiver, body, timestamp): MessageRow) -> Result<Message, RepositoryError> {
    let corrupted = |e: crate::domain::ValueObjectError| RepositoryError::CorruptedRecord(e.to_string());
    Ok(Message::new(
        UserId::new(sender).map_err(corrupted)?,
        UserId::new(receiver).map_err(corrupted)?,
        MessageBody::new(body).map_err(corrupted)?,
        Timestamp::new(timestamp),
    ))
}

#[async_trait]
impl MessageRepository for SqliteMessageRepository {
    async fn append(&self, message: &Message) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO messages (sender, receiver, body, timestamp) VALUES (?1, ?2, ?3, ?4)")
            .bind(message.sender.as_str())
            .bind(message.receiver.as_str())
            .bind(message.body.as_str())
            .bind(message.timestamp.value())
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn recent_messages(
        &self,
        user_a: &UserId,
        user_b: &UserId,
        limit: usize,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT sender, receiver, body, timestamp FROM messages
             WHERE (sender = ?1 AND receiver = ?2) OR (sender = ?2 AND receiver = ?1)
             ORDER BY timestamp DESC, id DESC
             LIMIT ?3",
        )
        .bind(user_a.as_str())
        .bind(user_b.as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        let mut messages = rows
            .into_iter()
            .map(into_message)
            .collect::<Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }
}

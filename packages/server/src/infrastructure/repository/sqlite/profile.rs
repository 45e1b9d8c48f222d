//! SQLite Profile Repository 実装
//!
//! `users` テーブルの `display_name` / `avatar` を参照する。
//! ユーザー登録・プロフィール更新は別システムの責務。

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::{ProfileRepository, RepositoryError, UserId, UserProfile};

use super::storage_error;

pub struct SqliteProfileRepository {
    pool: SqlitePool,
}

impl SqliteProfileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for SqliteProfileRepository {
    async fn find_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        let row: Option<(Option<String>, Option<String>)> =
            sqlx::query_as("SELECT display_name, avatar FROM users WHERE login = ?1")
                .bind(user_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_error)?;

        Ok(row.map(|(display_name, avatar)| UserProfile {
            display_name: display_name.unwrap_or_else(|| user_id.as_str().to_string()),
            user_id: user_id.clone(),
            avatar,
        }))
    }
}

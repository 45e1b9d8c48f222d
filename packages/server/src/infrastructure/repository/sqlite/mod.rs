//! SQLite Repository 実装
//!
//! `sqlx` の実行時クエリ（`sqlx::query` / `sqlx::query_as`）を使います。
//! スキーマは起動時に `CREATE TABLE IF NOT EXISTS` で作成します。

mod conversation;
mod message;
mod profile;

use std::str::FromStr;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};

use crate::domain::RepositoryError;

pub use conversation::SqliteConversationRepository;
pub use message::SqliteMessageRepository;
pub use profile::SqliteProfileRepository;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        login TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL DEFAULT '',
        display_name TEXT,
        avatar TEXT
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sender TEXT NOT NULL,
        receiver TEXT NOT NULL,
        body TEXT NOT NULL,
        timestamp INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_messages_pair_time
        ON messages (sender, receiver, timestamp)",
    "CREATE TABLE IF NOT EXISTS conversations (
        owner TEXT NOT NULL,
        peer TEXT NOT NULL,
        peer_display_name TEXT NOT NULL,
        peer_avatar TEXT,
        last_message TEXT NOT NULL,
        last_message_time INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        PRIMARY KEY (owner, peer)
    )",
];

/// SQLite に接続し、スキーマを作成したプールを返す
///
/// `sqlite::memory:` の場合は接続ごとに別の DB になるため、接続数を 1 に制限する。
pub async fn connect(database_url: &str) -> Result<SqlitePool, RepositoryError> {
    let in_memory = database_url.contains(":memory:");
    let mut options = SqliteConnectOptions::from_str(database_url)
        .map_err(storage_error)?
        .create_if_missing(true);
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(if in_memory { 1 } else { 8 })
        .connect_with(options)
        .await
        .map_err(storage_error)?;

    migrate(&pool).await?;
    tracing::info!("SQLite database ready at {}", database_url);
    Ok(pool)
}

async fn migrate(pool: &SqlitePool) -> Result<(), RepositoryError> {
    for statement in SCHEMA {
        sqlx::query(*statement)
            .execute(pool)
            .await
            .map_err(storage_error)?;
    }
    Ok(())
}

fn storage_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Storage(e.to_string())
}

//! Repository 実装
//!
//! - `inmemory`: HashMap / Vec をインメモリ DB として使う実装（テスト・開発用）
//! - `sqlite`: sqlx + SQLite による永続化実装

pub mod inmemory;
pub mod sqlite;

pub use inmemory::{
    InMemoryConversationRepository, InMemoryMessageRepository, InMemoryProfileRepository,
};
pub use sqlite::{
    SqliteConversationRepository, SqliteMessageRepository, SqliteProfileRepository, connect,
};

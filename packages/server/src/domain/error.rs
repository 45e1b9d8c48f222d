//! ドメイン層のエラー型

use thiserror::Error;

/// 値オブジェクト生成時のバリデーションエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("user id must not be empty")]
    UserIdEmpty,

    #[error("user id '{0}' must not contain whitespace")]
    UserIdContainsWhitespace(String),

    #[error("user id must be at most {max} characters")]
    UserIdTooLong { max: usize },

    #[error("message must not be empty")]
    MessageBodyEmpty,

    #[error("message must be at most {max} characters")]
    MessageBodyTooLong { max: usize },
}

/// 永続化層のエラー（StorageError）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// データストアへの読み書きに失敗した
    #[error("storage failure: {0}")]
    Storage(String),

    /// 保存されていたデータがドメインの制約を満たさない
    #[error("corrupted record: {0}")]
    CorruptedRecord(String),
}

/// 認証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing credential")]
    MissingToken,

    #[error("invalid credential: {0}")]
    InvalidToken(String),

    #[error("credential expired")]
    Expired,
}

/// 接続キューへのプッシュ失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    /// 受信者の送信キューが満杯
    #[error("outbound queue of '{0}' is full")]
    QueueFull(String),

    /// 受信者の送信キューが既に閉じている
    #[error("connection of '{0}' is closed")]
    Closed(String),
}

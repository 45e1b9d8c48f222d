//! UseCase 層のエラー型

use thiserror::Error;

use crate::domain::{AuthError, RepositoryError};

/// 接続時のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// 認証に失敗した（レジストリには何も登録されない）
    #[error("unauthenticated: {0}")]
    Unauthenticated(#[from] AuthError),
}

/// メッセージ送信時のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    /// 受信フレームが不正（接続は維持される）
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// メッセージの永続化に失敗した（未送信扱い、自動リトライしない）
    #[error("storage error: {0}")]
    Storage(RepositoryError),
}

/// 参照系ユースケースのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("invalid peer: {0}")]
    InvalidPeer(String),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

//! IdentityVerifier trait 定義
//!
//! 認証トークンを検証してユーザー ID を返す外部機能への境界。
//! トークンの発行・パスワード管理はこのシステムの範囲外。

#[cfg(test)]
use mockall::automock;

use super::{AuthError, UserId};

/// トークン検証器
///
/// 接続ハンドラから同期的に呼ばれるため、高速（ローカル）であることを前提とする。
#[cfg_attr(test, automock)]
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<UserId, AuthError>;
}

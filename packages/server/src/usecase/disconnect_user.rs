//! UseCase: ユーザー切断処理
//!
//! 接続タスクの終了時に、終了理由に関わらずちょうど 1 回呼ばれます。
//! 登録解除は接続 ID で保護されているため、同じユーザーの新しい接続を消しません。

use std::sync::Arc;

use crate::domain::{ConnectionRegistry, Registration};

/// 切断処理の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectOutcome {
    /// レジストリから実際に削除されたか（置き換え済みなら `false`）
    pub removed: bool,
    /// 切断後にオンラインの接続数
    pub remaining: usize,
}

/// ユーザー切断のユースケース
pub struct DisconnectUserUseCase {
    /// ConnectionRegistry（オンラインユーザーの管理）
    registry: Arc<dyn ConnectionRegistry>,
}

impl DisconnectUserUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// ユーザー切断を実行
    pub fn execute(&self, registration: Registration) -> DisconnectOutcome {
        let removed = registration.release();
        DisconnectOutcome {
            removed,
            remaining: self.registry.connection_count(),
        }
    }
}

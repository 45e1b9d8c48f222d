//! UseCase: ユーザー接続処理
//!
//! トークンを検証し、有界の送信キューを作ってレジストリに登録します。
//! 認証に失敗した場合、レジストリには一切触れません。

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::domain::{
    Connection, ConnectionRegistry, IdentityVerifier, OutboundEvent, PusherChannel,
    Registration, UserId,
};

use super::error::ConnectError;

/// 接続済みユーザー
pub struct ConnectedUser {
    /// 登録ガード（drop 時に保護付きで登録解除される）
    pub registration: Registration,
    /// この接続宛ての送信キューの受信側
    pub outbound: mpsc::Receiver<OutboundEvent>,
    /// 送信者自身への応答を積むための送信側（レジストリの登録とは別のハンドル）
    pub reply: PusherChannel,
}

impl ConnectedUser {
    pub fn user_id(&self) -> &UserId {
        self.registration.connection().user_id()
    }
}

/// ユーザー接続のユースケース
pub struct ConnectUserUseCase {
    /// IdentityVerifier（認証の抽象化）
    verifier: Arc<dyn IdentityVerifier>,
    /// ConnectionRegistry（オンラインユーザーの管理）
    registry: Arc<dyn ConnectionRegistry>,
    /// 接続ごとの送信キューの容量
    queue_capacity: usize,
}

impl ConnectUserUseCase {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        registry: Arc<dyn ConnectionRegistry>,
        queue_capacity: usize,
    ) -> Self {
        Self {
            verifier,
            registry,
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// ユーザー接続を実行
    ///
    /// # Arguments
    ///
    /// * `token` - 接続時に提示された認証トークン（無ければ `None`）
    ///
    /// # Returns
    ///
    /// * `Ok(ConnectedUser)` - 認証・登録に成功
    /// * `Err(ConnectError)` - 認証失敗（登録は行われない）
    pub fn execute(&self, token: Option<&str>) -> Result<ConnectedUser, ConnectError> {
        let token = token.ok_or(crate::domain::AuthError::MissingToken)?;
        let user_id = self.verifier.verify(token)?;

        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let connection = Connection::new(user_id, tx.clone());
        let (registration, superseded) = Registration::register(self.registry.clone(), connection);

        if let Some(previous) = superseded {
            tracing::info!(
                "'{}' reconnected; connection {} no longer receives deliveries",
                previous.user_id(),
                previous.id()
            );
        }

        Ok(ConnectedUser {
            registration,
            outbound: rx,
            reply: tx,
        })
    }
}

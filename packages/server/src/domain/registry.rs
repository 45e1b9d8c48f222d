//! 接続レジストリ
//!
//! オンライン中のユーザー ID と、そのユーザーの送信キューの対応を管理します。
//!
//! ## 不変条件
//!
//! - キー集合は「認証済みかつ未切断」のユーザーの部分集合である
//! - 1 ユーザーにつき登録される接続は高々 1 つ（後から登録した接続が優先）
//! - 登録解除は接続 ID で保護され、後から登録された接続を誤って削除しない

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};

use super::{ConnectionId, MessagePushError, OutboundEvent, UserId};

/// 接続ごとの送信キュー（有界）
pub type PusherChannel = mpsc::Sender<OutboundEvent>;

/// 1 本の生きている双方向接続
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    user_id: UserId,
    channel: PusherChannel,
}

impl Connection {
    pub fn new(user_id: UserId, channel: PusherChannel) -> Self {
        Self {
            id: ConnectionId::generate(),
            user_id,
            channel,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// 送信キューがまだ受信側（ソケットへの書き込みタスク）に繋がっているか
    pub fn is_alive(&self) -> bool {
        !self.channel.is_closed()
    }

    /// 送信キューへ非ブロッキングで積む
    ///
    /// キューが満杯、または閉じている場合は待たずにエラーを返す。
    pub fn try_push(&self, event: OutboundEvent) -> Result<(), MessagePushError> {
        self.channel.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => MessagePushError::QueueFull(self.user_id.to_string()),
            TrySendError::Closed(_) => MessagePushError::Closed(self.user_id.to_string()),
        })
    }
}

/// Connection Registry trait
///
/// 複数の接続タスクから同時に呼ばれる唯一の共有可変状態。
/// どの操作も失敗しない（「見つからない」は正常な結果）。
/// 内部構造を列挙する API は意図的に提供しない。
pub trait ConnectionRegistry: Send + Sync {
    /// 接続を登録し、置き換えられた以前の接続があれば返す
    ///
    /// 以前の接続のトランスポートはレジストリでは閉じない。
    fn register(&self, connection: Connection) -> Option<Connection>;

    /// 現在登録されている接続が `connection` 自身の場合に限り登録を解除する
    ///
    /// 実際に削除した場合は `true`。
    fn deregister(&self, connection: &Connection) -> bool;

    /// 配送先の接続を取得する（切断処理中の接続は返さない）
    fn lookup(&self, user_id: &UserId) -> Option<Connection>;

    /// 登録中の接続数
    fn connection_count(&self) -> usize;
}

/// 登録済み接続のガード
///
/// `release` するか drop された時点で、保護付きの登録解除をちょうど 1 回行う。
pub struct Registration {
    registry: Arc<dyn ConnectionRegistry>,
    connection: Connection,
    released: bool,
}

impl Registration {
    /// 接続を登録してガードを返す（置き換えられた接続があれば併せて返す）
    pub fn register(
        registry: Arc<dyn ConnectionRegistry>,
        connection: Connection,
    ) -> (Self, Option<Connection>) {
        let superseded = registry.register(connection.clone());
        let registration = Self {
            registry,
            connection,
            released: false,
        };
        (registration, superseded)
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// 登録を解除する。実際にレジストリから削除された場合は `true`
    pub fn release(mut self) -> bool {
        self.released = true;
        self.registry.deregister(&self.connection)
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            if self.registry.deregister(&self.connection) {
                tracing::debug!(
                    "Connection {} of '{}' deregistered on drop",
                    self.connection.id(),
                    self.connection.user_id()
                );
            }
        }
    }
}

//! InMemory ConnectionRegistry 実装
//!
//! ## 責務
//!
//! - ユーザー ID → 接続（送信キュー）の対応の保持
//! - 登録・保護付き登録解除・検索をアトミックに行う
//!
//! ## 設計ノート
//!
//! ロックは `std::sync::RwLock` を使い、HashMap の操作の間だけ保持します。
//! ロックを保持したまま `.await` することはありません。永続化や配送は
//! `lookup` で取り出した `Connection` のクローンに対して、ロックの外で行われます。

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use crate::domain::{Connection, ConnectionRegistry, UserId};

/// プロセス内 ConnectionRegistry 実装
#[derive(Default)]
pub struct InMemoryConnectionRegistry {
    /// Key: ユーザー ID
    /// Value: 現在有効な接続
    connections: RwLock<HashMap<UserId, Connection>>,
}

impl InMemoryConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConnectionRegistry for InMemoryConnectionRegistry {
    fn register(&self, connection: Connection) -> Option<Connection> {
        let user_id = connection.user_id().clone();
        let connection_id = connection.id();
        let superseded = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id.clone(), connection);

        match &superseded {
            Some(previous) => tracing::info!(
                "Connection {} of '{}' supersedes connection {}",
                connection_id,
                user_id,
                previous.id()
            ),
            None => tracing::debug!(
                "Connection {} of '{}' registered",
                connection_id,
                user_id
            ),
        }
        superseded
    }

    fn deregister(&self, connection: &Connection) -> bool {
        let mut connections = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let is_current = connections
            .get(connection.user_id())
            .is_some_and(|current| current.id() == connection.id());
        if is_current {
            connections.remove(connection.user_id());
            tracing::debug!(
                "Connection {} of '{}' deregistered",
                connection.id(),
                connection.user_id()
            );
        } else {
            tracing::debug!(
                "Connection {} of '{}' is no longer current, skipping deregister",
                connection.id(),
                connection.user_id()
            );
        }
        is_current
    }

    fn lookup(&self, user_id: &UserId) -> Option<Connection> {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .filter(|connection| connection.is_alive())
            .cloned()
    }

    fn connection_count(&self) -> usize {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::{MessageBody, OutboundEvent, Registration, Timestamp};
    use tokio::sync::mpsc;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - register / deregister / lookup の基本動作
    // - 同一ユーザーの再接続時に後勝ちになること
    // - 古い接続の登録解除が新しい接続を消さないこと（保護付き登録解除）
    // - 切断処理中（キューが閉じた）接続を lookup が返さないこと
    //
    // 【なぜこのテストが必要か】
    // - レジストリは全接続タスクから共有される唯一の可変状態
    // - 配送先の取り違えや、再接続直後の取りこぼしを防ぐ必要がある
    // ========================================

    fn alice() -> UserId {
        UserId::new("alice".to_string()).unwrap()
    }

    fn connection_for(user_id: UserId) -> (Connection, mpsc::Receiver<OutboundEvent>) {
        let (tx, rx) = mpsc::channel(8);
        (Connection::new(user_id, tx), rx)
    }

    #[test]
    fn test_register_then_lookup() {
        // テスト項目: 登録した接続が lookup で取得できる
        // given (前提条件):
        let registry = InMemoryConnectionRegistry::new();
        let (conn, _rx) = connection_for(alice());

        // when (操作):
        let superseded = registry.register(conn.clone());

        // then (期待する結果):
        assert!(superseded.is_none());
        assert_eq!(registry.lookup(&alice()).map(|c| c.id()), Some(conn.id()));
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn test_lookup_unknown_user_is_absent() {
        // テスト項目: 未登録ユーザーの lookup は None（エラーではない）
        // given (前提条件):
        let registry = InMemoryConnectionRegistry::new();

        // when (操作):
        let result = registry.lookup(&alice());

        // then (期待する結果):
        assert!(result.is_none());
    }

    #[test]
    fn test_register_supersedes_previous_connection() {
        // テスト項目: 同じユーザーの 2 本目の登録が 1 本目を置き換える
        // given (前提条件):
        let registry = InMemoryConnectionRegistry::new();
        let (first, _rx1) = connection_for(alice());
        let (second, _rx2) = connection_for(alice());
        registry.register(first.clone());

        // when (操作):
        let superseded = registry.register(second.clone());

        // then (期待する結果):
        assert_eq!(superseded.map(|c| c.id()), Some(first.id()));
        assert_eq!(registry.lookup(&alice()).map(|c| c.id()), Some(second.id()));
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn test_stale_deregister_keeps_superseding_connection() {
        // テスト項目: 置き換えられた接続の登録解除は新しい接続を削除しない
        // given (前提条件):
        let registry = InMemoryConnectionRegistry::new();
        let (first, _rx1) = connection_for(alice());
        let (second, _rx2) = connection_for(alice());
        registry.register(first.clone());
        registry.register(second.clone());

        // when (操作): 古い接続の切断処理が後から走る
        let removed = registry.deregister(&first);

        // then (期待する結果):
        assert!(!removed);
        assert_eq!(registry.lookup(&alice()).map(|c| c.id()), Some(second.id()));
    }

    #[test]
    fn test_deregister_current_connection() {
        // テスト項目: 現在の接続の登録解除で lookup が None になる
        // given (前提条件):
        let registry = InMemoryConnectionRegistry::new();
        let (conn, _rx) = connection_for(alice());
        registry.register(conn.clone());

        // when (操作):
        let removed = registry.deregister(&conn);

        // then (期待する結果):
        assert!(removed);
        assert!(registry.lookup(&alice()).is_none());
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn test_lookup_hides_closed_connection() {
        // テスト項目: 受信側が閉じた接続は lookup で返されない
        // given (前提条件):
        let registry = InMemoryConnectionRegistry::new();
        let (conn, rx) = connection_for(alice());
        registry.register(conn);

        // when (操作):
        drop(rx);

        // then (期待する結果):
        assert!(registry.lookup(&alice()).is_none());
    }

    #[test]
    fn test_registration_guard_deregisters_on_drop() {
        // テスト項目: Registration を drop すると登録が解除される
        // given (前提条件):
        let registry: Arc<dyn ConnectionRegistry> = Arc::new(InMemoryConnectionRegistry::new());
        let (conn, _rx) = connection_for(alice());
        let (registration, _) = Registration::register(registry.clone(), conn);
        assert_eq!(registry.connection_count(), 1);

        // when (操作):
        drop(registration);

        // then (期待する結果):
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn test_registration_release_is_guarded() {
        // テスト項目: 置き換えられた Registration の release は false を返し、新しい接続は残る
        // given (前提条件):
        let registry: Arc<dyn ConnectionRegistry> = Arc::new(InMemoryConnectionRegistry::new());
        let (first, _rx1) = connection_for(alice());
        let (second, _rx2) = connection_for(alice());
        let (first_registration, _) = Registration::register(registry.clone(), first);
        let (_second_registration, superseded) = Registration::register(registry.clone(), second);
        assert!(superseded.is_some());

        // when (操作):
        let removed = first_registration.release();

        // then (期待する結果):
        assert!(!removed);
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn test_try_push_on_full_queue_fails_without_blocking() {
        // テスト項目: 満杯のキューへの push は待たずに QueueFull を返す
        // given (前提条件):
        let (tx, _rx) = mpsc::channel(1);
        let conn = Connection::new(alice(), tx);
        let event = OutboundEvent::Message {
            from: UserId::new("bob".to_string()).unwrap(),
            body: MessageBody::new("hi".to_string()).unwrap(),
            timestamp: Timestamp::new(1),
        };
        conn.try_push(event.clone()).unwrap();

        // when (操作):
        let result = conn.try_push(event);

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(crate::domain::MessagePushError::QueueFull(_))
        ));
    }

    #[test]
    fn test_concurrent_register_and_deregister() {
        // テスト項目: 多数のスレッドから同時に登録・解除しても整合性が保たれる
        // given (前提条件):
        let registry = Arc::new(InMemoryConnectionRegistry::new());

        // when (操作): 各スレッドが別ユーザーを登録して解除する
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let user = UserId::new(format!("user{i}")).unwrap();
                    let (tx, _rx) = mpsc::channel(1);
                    let conn = Connection::new(user.clone(), tx);
                    registry.register(conn.clone());
                    assert!(registry.lookup(&user).is_some());
                    assert!(registry.deregister(&conn));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // then (期待する結果):
        assert_eq!(registry.connection_count(), 0);
    }
}

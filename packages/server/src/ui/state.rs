//! Shared application state.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::task::TaskTracker;

use crate::{
    domain::IdentityVerifier,
    usecase::{
        ConnectUserUseCase, DisconnectUserUseCase, GetRecentMessagesUseCase,
        ListConversationsUseCase, SendMessageUseCase,
    },
};

/// Shared application state
pub struct AppState {
    /// ConnectUserUseCase（接続・認証のユースケース）
    pub connect_user_usecase: Arc<ConnectUserUseCase>,
    /// DisconnectUserUseCase（切断のユースケース）
    pub disconnect_user_usecase: Arc<DisconnectUserUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    /// ListConversationsUseCase（会話一覧取得のユースケース）
    pub list_conversations_usecase: Arc<ListConversationsUseCase>,
    /// GetRecentMessagesUseCase（履歴取得のユースケース）
    pub get_recent_messages_usecase: Arc<GetRecentMessagesUseCase>,
    /// HTTP API の認証に使う IdentityVerifier
    pub identity_verifier: Arc<dyn IdentityVerifier>,
    /// サーバー停止の通知（`true` になったら各接続は Closing へ移る）
    pub shutdown: watch::Receiver<bool>,
    /// 生きている WebSocket 接続タスク（停止時にこれらの終了を待つ）
    pub connections: TaskTracker,
}

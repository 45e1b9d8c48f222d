//! Server execution logic.

use std::{future::Future, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use tokio::{net::TcpListener, sync::watch};
use tokio_util::task::TaskTracker;
use tower_http::trace::TraceLayer;

use crate::{
    domain::IdentityVerifier,
    usecase::{
        ConnectUserUseCase, DisconnectUserUseCase, GetRecentMessagesUseCase,
        ListConversationsUseCase, SendMessageUseCase,
    },
};

use super::{
    handler::{get_recent_messages, health_check, list_conversations, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

pub type ServerError = Box<dyn std::error::Error + Send + Sync>;

/// WebSocket messaging server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(
///     connect_user_usecase,
///     disconnect_user_usecase,
///     send_message_usecase,
///     list_conversations_usecase,
///     get_recent_messages_usecase,
///     verifier,
///     Duration::from_secs(5),
/// );
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    /// ConnectUserUseCase（接続・認証のユースケース）
    connect_user_usecase: Arc<ConnectUserUseCase>,
    /// DisconnectUserUseCase（切断のユースケース）
    disconnect_user_usecase: Arc<DisconnectUserUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    send_message_usecase: Arc<SendMessageUseCase>,
    /// ListConversationsUseCase（会話一覧取得のユースケース）
    list_conversations_usecase: Arc<ListConversationsUseCase>,
    /// GetRecentMessagesUseCase（履歴取得のユースケース）
    get_recent_messages_usecase: Arc<GetRecentMessagesUseCase>,
    /// HTTP API の認証に使う IdentityVerifier
    identity_verifier: Arc<dyn IdentityVerifier>,
    /// 停止時に接続が閉じるのを待つ上限
    shutdown_grace: Duration,
}

impl Server {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        connect_user_usecase: Arc<ConnectUserUseCase>,
        disconnect_user_usecase: Arc<DisconnectUserUseCase>,
        send_message_usecase: Arc<SendMessageUseCase>,
        list_conversations_usecase: Arc<ListConversationsUseCase>,
        get_recent_messages_usecase: Arc<GetRecentMessagesUseCase>,
        identity_verifier: Arc<dyn IdentityVerifier>,
        shutdown_grace: Duration,
    ) -> Self {
        Self {
            connect_user_usecase,
            disconnect_user_usecase,
            send_message_usecase,
            list_conversations_usecase,
            get_recent_messages_usecase,
            identity_verifier,
            shutdown_grace,
        }
    }

    /// Run the server until Ctrl+C or SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), ServerError> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Messaging server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws?token=<access token>", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// 停止時は全接続に停止を通知し、接続タスクがすべて終わるまで（最大 `shutdown_grace`）待つ。
    /// 置き換え済みでレジストリに載っていない接続も待機の対象になる。
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let connections = TaskTracker::new();
        let shutdown_grace = self.shutdown_grace;
        let app = self.router(shutdown_rx, connections.clone());

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown requested, closing connections");
                shutdown_tx.send_replace(true);
            })
            .await?;

        // アップグレード済みの接続は axum の graceful shutdown の対象外なので、ここで待つ
        connections.close();
        if tokio::time::timeout(shutdown_grace, connections.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                "{} connections still open after {:?}",
                connections.len(),
                shutdown_grace
            );
        }

        tracing::info!("Server shutdown complete");

        Ok(())
    }

    fn router(self, shutdown: watch::Receiver<bool>, connections: TaskTracker) -> Router {
        let app_state = Arc::new(AppState {
            connect_user_usecase: self.connect_user_usecase,
            disconnect_user_usecase: self.disconnect_user_usecase,
            send_message_usecase: self.send_message_usecase,
            list_conversations_usecase: self.list_conversations_usecase,
            get_recent_messages_usecase: self.get_recent_messages_usecase,
            identity_verifier: self.identity_verifier,
            shutdown,
            connections,
        });

        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/conversations", get(list_conversations))
            .route("/api/conversations/{peer}/messages", get(get_recent_messages))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state)
    }
}

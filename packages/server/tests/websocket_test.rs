//! Integration tests driving a real server on an ephemeral port.

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use hanashi_server::{
    domain::{
        ConnectionRegistry, Message as StoredMessage, MessageRepository, RepositoryError, UserId,
    },
    infrastructure::{
        identity::{DEFAULT_TOKEN_LIFETIME, JwtIdentityVerifier},
        registry::InMemoryConnectionRegistry,
        repository::{
            InMemoryConversationRepository, InMemoryMessageRepository, InMemoryProfileRepository,
        },
    },
    ui::Server,
    usecase::{
        ConnectUserUseCase, DisconnectUserUseCase, GetRecentMessagesUseCase,
        ListConversationsUseCase, SendMessageUseCase,
    },
};
use hanashi_shared::time::{MonotonicClock, SystemClock};
use serde_json::{Value, json};
use tokio::{net::TcpStream, sync::oneshot, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Message, protocol::frame::coding::CloseCode},
};

const SECRET: &str = "integration-test-secret";
const RECV_TIMEOUT: Duration = Duration::from_secs(3);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    addr: SocketAddr,
    registry: Arc<InMemoryConnectionRegistry>,
    verifier: Arc<JwtIdentityVerifier>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with_messages(Arc::new(InMemoryMessageRepository::new())).await
    }

    async fn start_with_messages(messages: Arc<dyn MessageRepository>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let conversations = Arc::new(InMemoryConversationRepository::new());
        let profiles = Arc::new(InMemoryProfileRepository::new());
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let verifier = Arc::new(JwtIdentityVerifier::new(SECRET));

        let server = Server::new(
            Arc::new(ConnectUserUseCase::new(
                verifier.clone(),
                registry.clone(),
                16,
            )),
            Arc::new(DisconnectUserUseCase::new(registry.clone())),
            Arc::new(SendMessageUseCase::new(
                messages.clone(),
                conversations.clone(),
                profiles,
                registry.clone(),
                Arc::new(MonotonicClock::new(SystemClock)),
            )),
            Arc::new(ListConversationsUseCase::new(conversations)),
            Arc::new(GetRecentMessagesUseCase::new(messages, 200)),
            verifier.clone(),
            Duration::from_secs(2),
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            server
                .serve(listener, async move {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            registry,
            verifier,
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    fn token(&self, user: &str) -> String {
        self.verifier
            .issue(&UserId::new(user.to_string()).unwrap(), DEFAULT_TOKEN_LIFETIME)
            .unwrap()
    }

    fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn connect(&self, user: &str) -> Socket {
        self.connect_with_token(&self.token(user)).await
    }

    async fn connect_with_token(&self, token: &str) -> Socket {
        let url = format!("ws://{}/ws?token={}", self.addr, token);
        let (socket, _) = connect_async(url).await.unwrap();
        socket
    }

    async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .unwrap()
            .unwrap();
    }
}

/// 追記の前に一定時間待つメッセージログ（処理中に停止が始まる状況を作る）
struct SlowMessageRepository {
    inner: InMemoryMessageRepository,
    delay: Duration,
    appended: AtomicUsize,
}

impl SlowMessageRepository {
    fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryMessageRepository::new(),
            delay,
            appended: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MessageRepository for SlowMessageRepository {
    async fn append(&self, message: &StoredMessage) -> Result<(), RepositoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.append(message).await?;
        self.appended.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn recent_messages(
        &self,
        user_a: &UserId,
        user_b: &UserId,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, RepositoryError> {
        self.inner.recent_messages(user_a, user_b, limit).await
    }
}

async fn send(socket: &mut Socket, to: &str, message: &str) {
    let frame = json!({ "to": to, "message": message }).to_string();
    socket.send(Message::text(frame)).await.unwrap();
}

/// Next text frame as JSON (ping/pong are skipped)
async fn recv(socket: &mut Socket) -> Value {
    loop {
        let message = tokio::time::timeout(RECV_TIMEOUT, socket.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .unwrap();
        match message {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Next close frame code
async fn recv_close_code(socket: &mut Socket) -> Option<u16> {
    loop {
        let message = tokio::time::timeout(RECV_TIMEOUT, socket.next())
            .await
            .expect("timed out waiting for close")?;
        match message {
            Ok(Message::Close(frame)) => return frame.map(|f| u16::from(f.code)),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
}

#[tokio::test]
async fn test_send_to_offline_recipient() {
    // テスト項目: 受信者オフライン時、送信者に sent と error が順に届き、メッセージは履歴に残る
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;

    // when (操作):
    send(&mut alice, "bob", "hi").await;

    // then (期待する結果):
    let sent = recv(&mut alice).await;
    assert_eq!(sent["type"], "sent");
    assert_eq!(sent["to"], "bob");
    assert_eq!(sent["message"], "hi");
    let error = recv(&mut alice).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["detail"], "recipient offline");

    let history: Value = reqwest::Client::new()
        .get(server.http_url("/api/conversations/bob/messages?limit=50"))
        .bearer_auth(server.token("alice"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["body"], "hi");

    server.stop().await;
}

#[tokio::test]
async fn test_send_to_online_recipient_updates_both_summaries() {
    // テスト項目: 受信者オンライン時、受信者に message が届き、双方の会話一覧が更新される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;

    // when (操作):
    send(&mut alice, "bob", "hi").await;

    // then (期待する結果):
    let sent = recv(&mut alice).await;
    assert_eq!(sent["type"], "sent");
    let pushed = recv(&mut bob).await;
    assert_eq!(pushed["type"], "message");
    assert_eq!(pushed["from"], "alice");
    assert_eq!(pushed["message"], "hi");
    assert_eq!(pushed["timestamp"], sent["timestamp"]);

    let client = reqwest::Client::new();
    for (owner, peer) in [("alice", "bob"), ("bob", "alice")] {
        let summaries: Value = client
            .get(server.http_url("/api/conversations"))
            .bearer_auth(server.token(owner))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let summaries = summaries.as_array().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0]["peer"], peer);
        assert_eq!(summaries[0]["last_message"], "hi");
    }

    server.stop().await;
}

#[tokio::test]
async fn test_messages_from_one_connection_arrive_in_order() {
    // テスト項目: 同一接続から送った E1, E2 は受信者にその順で届き、時刻も単調
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;

    // when (操作):
    send(&mut alice, "bob", "E1").await;
    send(&mut alice, "bob", "E2").await;

    // then (期待する結果):
    let first = recv(&mut bob).await;
    let second = recv(&mut bob).await;
    assert_eq!(first["message"], "E1");
    assert_eq!(second["message"], "E2");
    assert!(first["timestamp"].as_i64().unwrap() <= second["timestamp"].as_i64().unwrap());

    server.stop().await;
}

#[tokio::test]
async fn test_invalid_token_is_closed_without_registration() {
    // テスト項目: 不正なトークンの接続は 1008 で閉じられ、レジストリは変化しない
    // given (前提条件):
    let server = TestServer::start().await;
    let before = server.registry.connection_count();
    let forged = JwtIdentityVerifier::new("other-secret")
        .issue(&UserId::new("mallory".to_string()).unwrap(), DEFAULT_TOKEN_LIFETIME)
        .unwrap();

    // when (操作):
    let mut socket = server.connect_with_token(&forged).await;

    // then (期待する結果):
    assert_eq!(recv_close_code(&mut socket).await, Some(u16::from(CloseCode::Policy)));
    assert_eq!(server.registry.connection_count(), before);

    server.stop().await;
}

#[tokio::test]
async fn test_invalid_envelopes_keep_connection_open() {
    // テスト項目: 空白のみの本文・不正な JSON は error で応答され、接続は維持される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;

    // when (操作):
    send(&mut alice, "bob", "   ").await;
    alice.send(Message::text("not json")).await.unwrap();

    // then (期待する結果):
    assert_eq!(recv(&mut alice).await["type"], "error");
    assert_eq!(recv(&mut alice).await["type"], "error");

    send(&mut alice, "bob", "still here").await;
    assert_eq!(recv(&mut alice).await["type"], "sent");
    assert_eq!(recv(&mut alice).await["detail"], "recipient offline");

    let history: Value = reqwest::Client::new()
        .get(server.http_url("/api/conversations/bob/messages"))
        .bearer_auth(server.token("alice"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.as_array().unwrap().len(), 1);

    server.stop().await;
}

#[tokio::test]
async fn test_reconnect_supersedes_and_survives_stale_teardown() {
    // テスト項目: 再接続した接続が配送先になり、古い接続の切断後も配送先であり続ける
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice_old = server.connect("alice").await;
    let mut alice_new = server.connect("alice").await;
    let mut bob = server.connect("bob").await;

    // when (操作):
    alice_old.close(None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    send(&mut bob, "alice", "after reconnect").await;

    // then (期待する結果):
    assert_eq!(recv(&mut bob).await["type"], "sent");
    let pushed = recv(&mut alice_new).await;
    assert_eq!(pushed["type"], "message");
    assert_eq!(pushed["message"], "after reconnect");
    assert_eq!(server.registry.connection_count(), 2);

    server.stop().await;
}

#[tokio::test]
async fn test_http_api_requires_credential() {
    // テスト項目: HTTP API は資格情報なしでは 401、ヘルスチェックは認証不要
    // given (前提条件):
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    // when (操作):
    let unauthorized = client
        .get(server.http_url("/api/conversations"))
        .send()
        .await
        .unwrap();
    let health = client
        .get(server.http_url("/api/health"))
        .send()
        .await
        .unwrap();
    let via_cookie = client
        .get(server.http_url("/api/conversations"))
        .header("Cookie", format!("access_token={}", server.token("alice")))
        .send()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(unauthorized.status(), reqwest::StatusCode::UNAUTHORIZED);
    assert_eq!(health.status(), reqwest::StatusCode::OK);
    assert_eq!(via_cookie.status(), reqwest::StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_closes_connections_and_drains_registry() {
    // テスト項目: サーバー停止で接続は 1001 で閉じられ、レジストリは空になる
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let registry = server.registry.clone();
    assert_eq!(registry.connection_count(), 1);

    // when (操作):
    let stop = tokio::spawn(server.stop());

    // then (期待する結果):
    assert_eq!(recv_close_code(&mut alice).await, Some(u16::from(CloseCode::Away)));
    drop(alice);
    stop.await.unwrap();
    assert_eq!(registry.connection_count(), 0);
}

#[tokio::test]
async fn test_shutdown_waits_for_superseded_connection_in_flight() {
    // テスト項目: 置き換え済みの接続が処理中のエンベロープも、停止完了前に保存され応答される
    // given (前提条件):
    let messages = Arc::new(SlowMessageRepository::new(Duration::from_millis(800)));
    let server = TestServer::start_with_messages(messages.clone()).await;
    let mut alice_old = server.connect("alice").await;
    let _alice_new = server.connect("alice").await;
    let registry = server.registry.clone();
    send(&mut alice_old, "bob", "hi").await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // when (操作):
    server.stop().await;

    // then (期待する結果):
    assert_eq!(messages.appended.load(Ordering::SeqCst), 1);
    assert_eq!(registry.connection_count(), 0);
    assert_eq!(recv(&mut alice_old).await["type"], "sent");
    assert_eq!(recv(&mut alice_old).await["detail"], "recipient offline");
    assert_eq!(recv_close_code(&mut alice_old).await, Some(u16::from(CloseCode::Away)));
}

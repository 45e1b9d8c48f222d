//! WebSocket connection handlers.
//!
//! 1 接続につき 2 つの処理が並行して動きます。
//!
//! - 受信ループ: エンベロープを 1 件ずつ順番に SendMessageUseCase へ渡す
//! - pusher_loop: 送信キューの内容をソケットへ書き出す（他の接続からの配送もここを通る）

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    http::HeaderMap,
    response::Response,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use tokio::sync::{mpsc, watch};

use crate::{
    domain::{OutboundEvent, PusherChannel, UserId},
    infrastructure::dto::websocket::{ClientEnvelope, ServerFrame},
    ui::state::AppState,
    usecase::{ConnectError, ConnectedUser, RouteReport, SendMessageError, sender_events},
};

use super::credential::token_from_headers;

/// pusher_loop が残りのキューを書き出すのを待つ上限
const PUSHER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Query parameters for WebSocket connection
#[derive(Debug, Default, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

/// 受信ループを抜けた理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    /// クライアントが Close を送った、またはストリームが終わった
    ClientClosed,
    /// ソケットの読み込みエラー
    TransportError,
    /// pusher_loop が終了した（ソケットへの書き込み失敗）
    OutboundClosed,
    /// サーバー停止
    Shutdown,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Response {
    let token = query.token.or_else(|| token_from_headers(&headers));

    // 認証と登録はアップグレード前に行う。
    // アップグレードに失敗した場合は ConnectedUser の drop で登録解除される。
    // 接続タスクの追跡もアップグレード前に始める。
    let tracked = state.connections.token();
    match state.connect_user_usecase.execute(token.as_deref()) {
        Ok(connected) => {
            tracing::info!(
                "User '{}' authenticated (connection {})",
                connected.user_id(),
                connected.registration.connection().id()
            );
            ws.on_upgrade(move |socket| async move {
                handle_socket(socket, state, connected).await;
                drop(tracked);
            })
        }
        Err(ConnectError::Unauthenticated(e)) => {
            tracing::warn!("Rejected WebSocket connection: {}", e);
            ws.on_upgrade(move |socket| async move {
                reject_socket(socket).await;
                drop(tracked);
            })
        }
    }
}

/// 認証に失敗した接続を 1008 (policy violation) で閉じる
async fn reject_socket(mut socket: WebSocket) {
    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: Utf8Bytes::from_static("unauthenticated"),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        tracing::debug!("Failed to send unauthenticated close frame: {}", e);
    }
}

/// Spawns a task that receives events from the outbound queue and pushes them to the WebSocket sender.
///
/// The queue closes once every sender is dropped (the registry entry and the receive loop's
/// own handle). The task then returns the sink so the caller can finish the close handshake.
/// `None` is returned if writing to the socket failed.
fn pusher_loop(
    mut rx: mpsc::Receiver<OutboundEvent>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<Option<SplitSink<WebSocket, Message>>> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let frame = ServerFrame::from(event);
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to serialize outbound frame: {}", e);
                    continue;
                }
            };
            if let Err(e) = sender.send(Message::Text(json.into())).await {
                tracing::debug!("Failed to write to socket: {}", e);
                return None;
            }
        }
        Some(sender)
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, connected: ConnectedUser) {
    let ConnectedUser {
        registration,
        outbound,
        reply: own_channel,
    } = connected;
    let user_id = registration.connection().user_id().clone();

    let (sender, mut receiver) = socket.split();
    let mut send_task = pusher_loop(outbound, sender);

    let mut shutdown = state.shutdown.clone();
    let reason = loop {
        tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown) => break CloseReason::Shutdown,
            _ = own_channel.closed() => break CloseReason::OutboundClosed,
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    // 1 件の処理（永続化・配送・応答）が終わるまで次のフレームは読まない
                    route_frame(&state, &user_id, &own_channel, text.as_str()).await;
                }
                Some(Ok(Message::Binary(_))) => {
                    let result = Err(SendMessageError::InvalidEnvelope(
                        "binary frames are not supported".to_string(),
                    ));
                    reply(&own_channel, &result).await;
                }
                Some(Ok(Message::Close(_))) | None => break CloseReason::ClientClosed,
                Some(Ok(_)) => {
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                Some(Err(e)) => {
                    tracing::warn!("WebSocket error from '{}': {}", user_id, e);
                    break CloseReason::TransportError;
                }
            },
        }
    };
    tracing::info!("Connection of '{}' closing: {:?}", user_id, reason);

    // Closing: 登録解除は必ずここで 1 回だけ行う
    let outcome = state.disconnect_user_usecase.execute(registration);
    if outcome.removed {
        tracing::info!(
            "User '{}' disconnected ({} connections remaining)",
            user_id,
            outcome.remaining
        );
    } else {
        tracing::info!(
            "Connection of '{}' was already superseded ({} connections remaining)",
            user_id,
            outcome.remaining
        );
    }

    // 自分の送信ハンドルを手放すとキューが閉じ、pusher_loop は残りを書き出して終わる
    drop(own_channel);
    let sink = match tokio::time::timeout(PUSHER_DRAIN_TIMEOUT, &mut send_task).await {
        Ok(Ok(sink)) => sink,
        Ok(Err(e)) => {
            tracing::error!("Pusher task of '{}' failed: {}", user_id, e);
            None
        }
        Err(_) => {
            tracing::warn!("Pusher task of '{}' did not drain in time", user_id);
            send_task.abort();
            None
        }
    };

    if let (Some(mut sink), CloseReason::Shutdown) = (sink, reason) {
        let frame = CloseFrame {
            code: close_code::AWAY,
            reason: Utf8Bytes::from_static("server shutting down"),
        };
        if let Err(e) = sink.send(Message::Close(Some(frame))).await {
            tracing::debug!("Failed to send shutdown close frame to '{}': {}", user_id, e);
        }
    }
}

/// 1 フレームを解釈してルーティングし、送信者への応答を自分の送信キューへ積む
async fn route_frame(state: &AppState, user_id: &UserId, own_channel: &PusherChannel, text: &str) {
    let result = match serde_json::from_str::<ClientEnvelope>(text) {
        Ok(envelope) => {
            state
                .send_message_usecase
                .execute(user_id, envelope.into())
                .await
        }
        Err(e) => {
            tracing::warn!("Malformed frame from '{}': {}", user_id, e);
            Err(SendMessageError::InvalidEnvelope(format!(
                "malformed frame: {e}"
            )))
        }
    };

    if let Err(e) = &result {
        tracing::warn!("Message from '{}' was not sent: {}", user_id, e);
    }
    reply(own_channel, &result).await;
}

async fn reply(own_channel: &PusherChannel, result: &Result<RouteReport, SendMessageError>) {
    for event in sender_events(result) {
        if own_channel.send(event).await.is_err() {
            // pusher_loop は既に終了している。受信ループは次の select で抜ける
            break;
        }
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    // 送信側が drop された場合も停止とみなす
    let _ = shutdown.wait_for(|stop| *stop).await;
}

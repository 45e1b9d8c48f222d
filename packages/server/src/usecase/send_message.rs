//! UseCase: メッセージ送信処理（ルーティング）
//!
//! ## 処理の流れ
//!
//! 1. エンベロープの検証（宛先・本文・自分宛て）
//! 2. メッセージの永続化（受信者がオンラインかどうかに関わらず必ず行う）
//! 3. 送信者側・受信者側の会話サマリーを upsert
//! 4. レジストリで受信者を検索し、オンラインなら送信キューへ非ブロッキングで積む
//!
//! 永続化が完了するまで配送は行わないため、受信者が永続化前のメッセージを見ることはない。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() と sender_events()
//!
//! ### どのような状況を想定しているか
//! - 正常系：受信者オンライン（配送）／オフライン（保存のみ）
//! - 異常系：空白のみの本文、空の宛先、自分宛て、永続化失敗
//! - エッジケース：受信者キューが満杯、会話サマリーの更新失敗

use std::sync::Arc;

use hanashi_shared::time::Clock;

use crate::domain::{
    ConnectionRegistry, ConversationRepository, Envelope, Message, MessageBody, MessageRepository,
    OutboundEvent, ProfileRepository, SummaryUpdate, Timestamp, UserId, UserProfile,
};

use super::error::SendMessageError;

/// 受信者がオフラインの場合に送信者へ返すエラー詳細
pub const RECIPIENT_OFFLINE_DETAIL: &str = "recipient offline";

/// 永続化失敗時に送信者へ返すエラー詳細
const STORAGE_FAILURE_DETAIL: &str = "failed to store message, please resend";

/// 配送結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// 受信者の送信キューに積んだ
    Delivered,
    /// 受信者が未接続、またはキューが満杯・切断処理中（メッセージ自体は保存済み）
    Undeliverable,
}

/// ルーティング結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteReport {
    pub message: Message,
    pub delivery: DeliveryOutcome,
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    /// MessageRepository（メッセージログ）
    messages: Arc<dyn MessageRepository>,
    /// ConversationRepository（会話サマリー）
    conversations: Arc<dyn ConversationRepository>,
    /// ProfileRepository（表示名・アバター）
    profiles: Arc<dyn ProfileRepository>,
    /// ConnectionRegistry（配送先の検索）
    registry: Arc<dyn ConnectionRegistry>,
    /// 永続化時刻を付与する時計
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        conversations: Arc<dyn ConversationRepository>,
        profiles: Arc<dyn ProfileRepository>,
        registry: Arc<dyn ConnectionRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            messages,
            conversations,
            profiles,
            registry,
            clock,
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `sender` - 接続の認証済みユーザー（暗黙の送信者）
    /// * `envelope` - 受信したエンベロープ
    ///
    /// # Returns
    ///
    /// * `Ok(RouteReport)` - 保存済みメッセージと配送結果
    /// * `Err(SendMessageError)` - 検証エラーまたは永続化失敗（いずれも未送信扱い）
    pub async fn execute(
        &self,
        sender: &UserId,
        envelope: Envelope,
    ) -> Result<RouteReport, SendMessageError> {
        // 1. 検証
        let (receiver, body) = validate(sender, envelope)?;

        // 2. 永続化（時刻はサーバー側で付与）
        let timestamp = Timestamp::new(self.clock.now_millis());
        let message = Message::new(sender.clone(), receiver, body, timestamp);
        self.messages
            .append(&message)
            .await
            .map_err(SendMessageError::Storage)?;

        // 3. 会話サマリーの更新
        self.update_summaries(&message).await;

        // 4. 配送
        let delivery = self.deliver(&message);

        Ok(RouteReport { message, delivery })
    }

    /// 送信者・受信者それぞれの視点で会話サマリーを upsert する
    ///
    /// メッセージは既に保存されているため、ここでの失敗は送信失敗にしない。
    async fn update_summaries(&self, message: &Message) {
        let sender_profile = self.profile_of(&message.sender).await;
        let receiver_profile = self.profile_of(&message.receiver).await;

        let updates = [
            SummaryUpdate::new(message.sender.clone(), &receiver_profile, message),
            SummaryUpdate::new(message.receiver.clone(), &sender_profile, message),
        ];
        for update in &updates {
            if let Err(e) = self.conversations.upsert_summary(update).await {
                tracing::warn!(
                    "Failed to update conversation summary of '{}' with '{}': {}",
                    update.owner,
                    update.peer,
                    e
                );
            }
        }
    }

    async fn profile_of(&self, user_id: &UserId) -> UserProfile {
        match self.profiles.find_profile(user_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => UserProfile::fallback(user_id.clone()),
            Err(e) => {
                tracing::warn!("Failed to load profile of '{}': {}", user_id, e);
                UserProfile::fallback(user_id.clone())
            }
        }
    }

    /// 受信者の送信キューへ積む（待たない）
    fn deliver(&self, message: &Message) -> DeliveryOutcome {
        let Some(connection) = self.registry.lookup(&message.receiver) else {
            tracing::debug!("'{}' is offline, skipping live delivery", message.receiver);
            return DeliveryOutcome::Undeliverable;
        };

        let event = OutboundEvent::Message {
            from: message.sender.clone(),
            body: message.body.clone(),
            timestamp: message.timestamp,
        };
        match connection.try_push(event) {
            Ok(()) => {
                tracing::debug!(
                    "Delivered message from '{}' to '{}'",
                    message.sender,
                    message.receiver
                );
                DeliveryOutcome::Delivered
            }
            Err(e) => {
                tracing::warn!("Failed to deliver to '{}': {}", message.receiver, e);
                DeliveryOutcome::Undeliverable
            }
        }
    }
}

fn validate(sender: &UserId, envelope: Envelope) -> Result<(UserId, MessageBody), SendMessageError> {
    if envelope.to.trim().is_empty() {
        return Err(SendMessageError::InvalidEnvelope(
            "recipient must not be empty".to_string(),
        ));
    }
    let receiver = UserId::new(envelope.to)
        .map_err(|e| SendMessageError::InvalidEnvelope(e.to_string()))?;
    if &receiver == sender {
        return Err(SendMessageError::InvalidEnvelope(
            "cannot send a message to yourself".to_string(),
        ));
    }
    let body = MessageBody::new(envelope.message)
        .map_err(|e| SendMessageError::InvalidEnvelope(e.to_string()))?;
    Ok((receiver, body))
}

/// ルーティング結果から送信者自身に返すイベントを作る
///
/// - 配送済み: `sent`
/// - 受信者オフライン: `sent` + `error`
/// - 検証エラー・永続化失敗: `error`
pub fn sender_events(result: &Result<RouteReport, SendMessageError>) -> Vec<OutboundEvent> {
    match result {
        Ok(report) => {
            let mut events = vec![OutboundEvent::Sent {
                to: report.message.receiver.clone(),
                body: report.message.body.clone(),
                timestamp: report.message.timestamp,
            }];
            if report.delivery == DeliveryOutcome::Undeliverable {
                events.push(OutboundEvent::error(RECIPIENT_OFFLINE_DETAIL));
            }
            events
        }
        Err(SendMessageError::InvalidEnvelope(reason)) => vec![OutboundEvent::error(reason.as_str())],
        Err(SendMessageError::Storage(_)) => vec![OutboundEvent::error(STORAGE_FAILURE_DETAIL)],
    }
}

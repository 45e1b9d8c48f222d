//! エンティティ

use super::value_object::{MessageBody, Timestamp, UserId};

/// 接続から受け取った 1 件の送信要求
///
/// 送信者は接続の認証済みユーザーであり、エンベロープ自体には含まれない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub to: String,
    pub message: String,
}

/// 永続化されたメッセージ（追記のみ、更新・削除しない）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender: UserId,
    pub receiver: UserId,
    pub body: MessageBody,
    /// サーバー側で永続化時に付与される
    pub timestamp: Timestamp,
}

impl Message {
    pub fn new(sender: UserId, receiver: UserId, body: MessageBody, timestamp: Timestamp) -> Self {
        Self {
            sender,
            receiver,
            body,
            timestamp,
        }
    }
}

/// 会話サマリー（閲覧ユーザーごと）
///
/// `(owner, peer)` につき 1 行。最初のメッセージで作成され、以降は
/// `last_message` / `last_message_time` のみ上書きされる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub owner: UserId,
    pub peer: UserId,
    pub peer_display_name: String,
    pub peer_avatar: Option<String>,
    pub last_message: String,
    pub last_message_time: Timestamp,
    pub created_at: Timestamp,
}

/// 会話サマリーの upsert 内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryUpdate {
    pub owner: UserId,
    pub peer: UserId,
    pub peer_display_name: String,
    pub peer_avatar: Option<String>,
    pub last_message: String,
    pub last_message_time: Timestamp,
}

impl SummaryUpdate {
    /// `owner` から見た `peer` との会話の更新内容を作る
    pub fn new(owner: UserId, peer: &UserProfile, message: &Message) -> Self {
        Self {
            owner,
            peer: peer.user_id.clone(),
            peer_display_name: peer.display_name.clone(),
            peer_avatar: peer.avatar.clone(),
            last_message: message.body.as_str().to_string(),
            last_message_time: message.timestamp,
        }
    }
}

/// 会話サマリーに非正規化して保持するユーザーの表示情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: UserId,
    pub display_name: String,
    pub avatar: Option<String>,
}

impl UserProfile {
    /// プロフィールが登録されていないユーザー向けの既定値（表示名 = ユーザー名）
    pub fn fallback(user_id: UserId) -> Self {
        Self {
            display_name: user_id.as_str().to_string(),
            user_id,
            avatar: None,
        }
    }
}

/// 接続へ送り出すイベント
///
/// ワイヤ上では `type` で区別される 3 種類のフレームに対応する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// 受信者へ配送されるメッセージ
    Message {
        from: UserId,
        body: MessageBody,
        timestamp: Timestamp,
    },
    /// 送信者への送信完了通知
    Sent {
        to: UserId,
        body: MessageBody,
        timestamp: Timestamp,
    },
    /// 送信者へのエラー通知
    Error { detail: String },
}

impl OutboundEvent {
    pub fn error(detail: impl Into<String>) -> Self {
        Self::Error {
            detail: detail.into(),
        }
    }
}

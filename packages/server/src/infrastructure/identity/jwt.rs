//! JWT による IdentityVerifier 実装
//!
//! `sub` クレームをユーザー名として扱います。トークン発行はこのサーバーの責務ではありませんが、
//! 開発・テスト用に同じ鍵で発行する `issue` を用意しています。

use std::time::Duration;

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AuthError, IdentityVerifier, UserId};

/// トークンの既定の有効期間（15 分）
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(15 * 60);

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// ユーザー名
    sub: String,
    /// Expiration time (Unix timestamp, seconds)
    exp: u64,
    /// Issued at time (Unix timestamp, seconds)
    iat: u64,
    /// Token ID
    jti: String,
}

/// HS256 JWT verifier
pub struct JwtIdentityVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// `user_id` 用のトークンを発行する
    pub fn issue(&self, user_id: &UserId, lifetime: Duration) -> Result<String, AuthError> {
        let now = now_secs();
        self.issue_with_expiry(user_id, now, now.saturating_add(lifetime.as_secs()))
    }

    fn issue_with_expiry(&self, user_id: &UserId, iat: u64, exp: u64) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id.as_str().to_string(),
            exp,
            iat,
            jti: Uuid::new_v4().simple().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidToken(format!("failed to encode token: {e}")))
    }
}

impl IdentityVerifier for JwtIdentityVerifier {
    fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::MissingToken);
        }

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        UserId::new(data.claims.sub).map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

fn now_secs() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}

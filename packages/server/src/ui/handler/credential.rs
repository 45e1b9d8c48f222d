//! Access token extraction from request headers.

use axum::http::{HeaderMap, header};

/// Cookie carrying the access token
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// `Authorization: Bearer <token>` を優先し、なければ `access_token` クッキーから取り出す
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| cookie_token(headers))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == ACCESS_TOKEN_COOKIE)
        .map(|(_, token)| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        // テスト項目: Authorization ヘッダーからトークンを取り出す
        // given (前提条件):
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));

        // when (操作):
        let token = token_from_headers(&headers);

        // then (期待する結果):
        assert_eq!(token.as_deref(), Some("abc.def"));
    }

    #[test]
    fn test_cookie_token() {
        // テスト項目: 複数のクッキーの中から access_token を取り出す
        // given (前提条件):
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; access_token=xyz; lang=ja"),
        );

        // when (操作):
        let token = token_from_headers(&headers);

        // then (期待する結果):
        assert_eq!(token.as_deref(), Some("xyz"));
    }

    #[test]
    fn test_no_token() {
        // テスト項目: 資格情報がない場合・Bearer 以外の方式の場合は None
        // given (前提条件):
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));

        // when (操作):
        let token = token_from_headers(&headers);

        // then (期待する結果):
        assert_eq!(token, None);
    }
}

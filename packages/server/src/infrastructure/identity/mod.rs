//! IdentityVerifier の実装
//!
//! - `jwt`: HS256 署名の JWT を検証する実装

pub mod jwt;

pub use jwt::{DEFAULT_TOKEN_LIFETIME, JwtIdentityVerifier};

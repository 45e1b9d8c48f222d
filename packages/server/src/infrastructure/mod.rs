//! Infrastructure 層
//!
//! ドメイン層が定義するポートの具体的な実装と、ワイヤ上の DTO を提供します。

pub mod dto;
pub mod identity;
pub mod registry;
pub mod repository;

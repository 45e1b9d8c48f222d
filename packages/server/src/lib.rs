//! Hanashi server: real-time 1:1 messaging over WebSocket.
//!
//! Layers:
//! - `domain`: value objects, entities and ports
//! - `usecase`: connect / disconnect / message routing / read-side queries
//! - `infrastructure`: registry, repositories, identity verification and DTOs
//! - `ui`: axum HTTP + WebSocket transport

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

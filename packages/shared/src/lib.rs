//! Utilities shared by the Hanashi server and client.

pub mod logger;
pub mod time;

//! Interactive CLI client for the Hanashi messaging server.

mod domain;
mod error;
mod formatter;
mod input;
mod runner;
mod session;
mod ui;

pub use error::ClientError;
pub use runner::run_client;

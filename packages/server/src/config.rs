//! Server configuration (command-line flags with environment fallbacks).

use std::time::Duration;

use clap::Parser;

/// `--database-url` value selecting the in-memory repositories
pub const IN_MEMORY_DATABASE_URL: &str = "memory";

#[derive(Parser, Debug, Clone)]
#[command(name = "hanashi-server")]
#[command(about = "Real-time 1:1 messaging server over WebSocket", long_about = None)]
pub struct ServerConfig {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HANASHI_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "HANASHI_PORT", default_value = "8080")]
    pub port: u16,

    /// SQLite database URL, or `memory` for non-durable in-memory storage
    #[arg(long, env = "HANASHI_DATABASE_URL", default_value = "sqlite://hanashi.db")]
    pub database_url: String,

    /// Shared secret used to verify HS256 access tokens
    #[arg(long, env = "HANASHI_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Capacity of each connection's outbound queue
    #[arg(long, env = "HANASHI_OUTBOUND_QUEUE_CAPACITY", default_value = "64")]
    pub outbound_queue_capacity: usize,

    /// Maximum number of messages returned by one history query
    #[arg(long, env = "HANASHI_HISTORY_LIMIT", default_value = "200")]
    pub history_limit: usize,

    /// How long shutdown waits for open connections to close (milliseconds)
    #[arg(long, env = "HANASHI_SHUTDOWN_GRACE_MS", default_value = "5000")]
    pub shutdown_grace_ms: u64,

    /// Default log level when RUST_LOG is not set
    #[arg(long, env = "HANASHI_LOG_LEVEL", default_value = "debug")]
    pub log_level: String,

    /// Print an access token for the given user and exit
    #[arg(long, value_name = "USER")]
    pub issue_token: Option<String>,
}

impl ServerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn uses_in_memory_storage(&self) -> bool {
        self.database_url == IN_MEMORY_DATABASE_URL
    }
}

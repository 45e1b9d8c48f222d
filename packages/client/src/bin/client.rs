//! Interactive direct-message client.
//!
//! Connects to the messaging server with an access token and sends messages from stdin.
//! Automatically reconnects on disconnection (max 5 attempts with 5 second interval),
//! except when the server rejects the token.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hanashi-client -- --token "$(cargo run -q --bin hanashi-server -- --jwt-secret dev --issue-token alice)"
//! ```

use clap::Parser;
use hanashi_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "hanashi-client")]
#[command(about = "Interactive 1:1 messaging client", long_about = None)]
struct Args {
    /// Access token (JWT) identifying the user
    #[arg(short = 't', long, env = "HANASHI_TOKEN", hide_env_values = true)]
    token: String,

    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    if let Err(e) = hanashi_client::run_client(args.url, args.token).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}

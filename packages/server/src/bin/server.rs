//! Real-time 1:1 messaging server.
//!
//! Authenticated users connect over WebSocket and send messages addressed to another user.
//! Every message is stored; online recipients receive it immediately.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hanashi-server -- --jwt-secret dev-secret
//! cargo run --bin hanashi-server -- --jwt-secret dev-secret --database-url memory --port 3000
//! cargo run --bin hanashi-server -- --jwt-secret dev-secret --issue-token alice
//! ```

use std::sync::Arc;

use clap::Parser;
use hanashi_server::{
    config::ServerConfig,
    domain::{ConversationRepository, MessageRepository, ProfileRepository, UserId},
    infrastructure::{
        identity::{DEFAULT_TOKEN_LIFETIME, JwtIdentityVerifier},
        registry::InMemoryConnectionRegistry,
        repository::{
            InMemoryConversationRepository, InMemoryMessageRepository, InMemoryProfileRepository,
            SqliteConversationRepository, SqliteMessageRepository, SqliteProfileRepository,
            connect,
        },
    },
    ui::Server,
    usecase::{
        ConnectUserUseCase, DisconnectUserUseCase, GetRecentMessagesUseCase,
        ListConversationsUseCase, SendMessageUseCase,
    },
};
use hanashi_shared::{
    logger::setup_logger,
    time::{MonotonicClock, SystemClock},
};

type Repositories = (
    Arc<dyn MessageRepository>,
    Arc<dyn ConversationRepository>,
    Arc<dyn ProfileRepository>,
);

#[tokio::main]
async fn main() {
    let config = ServerConfig::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &config.log_level);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let verifier = Arc::new(JwtIdentityVerifier::new(&config.jwt_secret));

    if let Some(user) = &config.issue_token {
        let user_id = UserId::new(user.clone())?;
        println!("{}", verifier.issue(&user_id, DEFAULT_TOKEN_LIFETIME)?);
        return Ok(());
    }

    // Initialize dependencies in order:
    // 1. Repositories
    // 2. Connection Registry
    // 3. UseCases
    // 4. Server

    // 1. Create Repositories
    let (messages, conversations, profiles) = create_repositories(&config).await?;

    // 2. Create Connection Registry (single process)
    let registry = Arc::new(InMemoryConnectionRegistry::new());

    // 3. Create UseCases
    let connect_user_usecase = Arc::new(ConnectUserUseCase::new(
        verifier.clone(),
        registry.clone(),
        config.outbound_queue_capacity,
    ));
    let disconnect_user_usecase = Arc::new(DisconnectUserUseCase::new(registry.clone()));
    let send_message_usecase = Arc::new(SendMessageUseCase::new(
        messages.clone(),
        conversations.clone(),
        profiles,
        registry,
        Arc::new(MonotonicClock::new(SystemClock)),
    ));
    let list_conversations_usecase = Arc::new(ListConversationsUseCase::new(conversations));
    let get_recent_messages_usecase = Arc::new(GetRecentMessagesUseCase::new(
        messages,
        config.history_limit,
    ));

    // 4. Create and run the server
    let server = Server::new(
        connect_user_usecase,
        disconnect_user_usecase,
        send_message_usecase,
        list_conversations_usecase,
        get_recent_messages_usecase,
        verifier,
        config.shutdown_grace(),
    );
    server.run(config.host, config.port).await
}

async fn create_repositories(
    config: &ServerConfig,
) -> Result<Repositories, Box<dyn std::error::Error + Send + Sync>> {
    if config.uses_in_memory_storage() {
        tracing::warn!("Using in-memory storage; messages are lost on restart");
        return Ok((
            Arc::new(InMemoryMessageRepository::new()),
            Arc::new(InMemoryConversationRepository::new()),
            Arc::new(InMemoryProfileRepository::new()),
        ));
    }

    let pool = connect(&config.database_url).await?;
    Ok((
        Arc::new(SqliteMessageRepository::new(pool.clone())),
        Arc::new(SqliteConversationRepository::new(pool.clone())),
        Arc::new(SqliteProfileRepository::new(pool)),
    ))
}

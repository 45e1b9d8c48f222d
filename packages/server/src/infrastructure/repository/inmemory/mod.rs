//! InMemory Repository 実装
//!
//! プロセスの終了とともにデータは失われます。

mod conversation;
mod message;
mod profile;

pub use conversation::InMemoryConversationRepository;
pub use message::InMemoryMessageRepository;
pub use profile::InMemoryProfileRepository;

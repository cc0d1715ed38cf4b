//! Session/Message persistence: the `chat_session`/`chat_message`
//! tables and the cursor-paginated read path, over the shared Postgres
//! read-write pool, plus the message-lifecycle operations (append,
//! in-place update, confirmation) the confirmation protocol needs.

pub mod db;
pub mod error;
pub mod manager;
pub mod types;

pub use error::{Result, SessionError};
pub use manager::SessionStore;
pub use types::{ChatMessage, ChatSession, NewMessage};

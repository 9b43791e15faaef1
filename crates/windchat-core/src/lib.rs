pub mod config;
pub mod controller;
pub mod error;
pub mod format;
pub mod gateway;
pub mod state;
pub mod store;
pub mod title;

// Re-export main types for convenience
pub use config::Config;
pub use controller::{PendingSend, SessionController, SessionSnapshot};
pub use error::{GatewayError, SessionError, SessionResult};
pub use gateway::{AskReply, HistoryRecord, HttpGateway, SyncGateway};
pub use state::{Conversation, ConversationId, Credential, Message, MessageId, Origin};
pub use store::ConversationStore;
pub use title::derive_title;

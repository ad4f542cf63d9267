//! Error types for the conversation engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type ChatResult<T> = Result<T, ChatError>;

/// Errors that can occur during engine operations.
///
/// Invariant violations (an empty store, two provisional messages in one
/// conversation) are programming errors and are asserted at the store
/// boundary rather than surfaced here.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Persona not found: {0}")]
    PersonaNotFound(String),

    #[error("The default persona cannot be deleted")]
    DefaultPersonaProtected,

    #[error("An exchange is already in flight for conversation {0}")]
    ExchangeInProgress(String),

    #[error("The exchange was cancelled before it finished")]
    ExchangeCancelled,

    #[error("Response synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

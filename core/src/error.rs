/// Error types for the messaging core
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid pairing: a conversation needs two distinct participants")]
    InvalidPairing,

    #[error("sender {0} is not a participant of this conversation")]
    NotParticipant(String),

    #[error("message text is empty")]
    EmptyText,

    #[error("conversation is no longer active")]
    ConversationInactive,

    #[error("vanish messages require a premium sender")]
    PermissionDenied,

    #[error("unknown conversation: {0}")]
    UnknownConversation(String),

    #[error("not connected to the chat server")]
    NotConnected,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout error: {0}")]
    Timeout(String),
}

pub type Result<T> = std::result::Result<T, ChatError>;

/// Shared types for the messaging core
use serde::{Deserialize, Serialize};

/// External user identity, referenced by the core but owned by the caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    /// Gates the vanish feature
    pub is_premium: bool,
    pub avatar_color: String,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, is_premium: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_premium,
            avatar_color: "bg-blue-500".to_string(),
        }
    }
}

/// Per-send vanish options
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VanishOptions {
    pub vanish: bool,
    /// Countdown in seconds; the session default applies when None
    pub after_secs: Option<u32>,
}

impl VanishOptions {
    pub fn after(secs: u32) -> Self {
        Self {
            vanish: true,
            after_secs: Some(secs),
        }
    }
}

/// Delivery state of an optimistically appended message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Appended locally, not yet pushed over the transport
    Pending,
    /// Emitted over the transport (fire-and-forget, no ack protocol)
    Sent,
    /// Server echo observed for this message id
    Delivered,
    /// Transport rejected the send; the bubble stays, flagged
    Failed,
}

/// Real-time events streamed to UI subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// An inbound message was applied to the store
    MessageReceived {
        conversation_id: String,
        message_id: String,
    },
    /// A message we sent was echoed back by the server
    MessageDelivered { message_id: String },
    /// A message we sent could not be emitted
    MessageFailed { message_id: String },
    /// A vanish countdown ticked; remaining seconds until hide
    VanishTick {
        conversation_id: String,
        message_id: String,
        remaining: u32,
    },
    /// A vanish message crossed zero and is now hidden
    MessageVanished {
        conversation_id: String,
        message_id: String,
    },
    /// The conversation-level typing flag changed
    TypingChanged { typing: bool },
    /// The online-user set was replaced
    PresenceChanged { online: Vec<String> },
    /// Transport came up
    Connected,
    /// Transport went down (reconnect budget exhausted or explicit)
    Disconnected,
}

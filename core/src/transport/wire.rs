/// Wire protocol for the chat channel
use serde::{Deserialize, Serialize};
use std::fmt;

/// Events exchanged with the chat server. Connect/disconnect are
/// transport-level and carry no payload, so they have no wire shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum WireEvent {
    /// Sent once right after the channel comes up
    #[serde(rename = "auth")]
    Auth {
        #[serde(rename = "userId")]
        user_id: String,
    },

    /// A chat message in either direction
    #[serde(rename = "message")]
    Message {
        id: String,
        #[serde(rename = "senderId")]
        sender_id: String,
        /// Older servers send "content" instead of "text"
        #[serde(alias = "content")]
        text: String,
        /// Unix milliseconds
        timestamp: i64,
        #[serde(rename = "isRead", default)]
        is_read: bool,
        #[serde(rename = "isVanished", default)]
        is_vanished: bool,
        #[serde(rename = "vanishAfter", skip_serializing_if = "Option::is_none")]
        vanish_after: Option<u32>,
    },

    /// Typing indicator for the conversation
    #[serde(rename = "typing")]
    Typing { typing: bool },

    /// Full snapshot of online user ids; replaces the previous set
    #[serde(rename = "online-users")]
    OnlineUsers { users: Vec<String> },
}

impl WireEvent {
    /// Serialize event to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize event from JSON bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    /// Get event type as string
    pub fn event_type(&self) -> &'static str {
        match self {
            WireEvent::Auth { .. } => "auth",
            WireEvent::Message { .. } => "message",
            WireEvent::Typing { .. } => "typing",
            WireEvent::OnlineUsers { .. } => "online-users",
        }
    }
}

impl fmt::Display for WireEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WireEvent({})", self.event_type())
    }
}

/// Protocol frame with length prefix
#[derive(Debug)]
pub struct Frame {
    pub length: u32,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a new frame from an event
    pub fn from_event(event: &WireEvent) -> Result<Self, serde_json::Error> {
        let payload = event.to_bytes()?;
        Ok(Self {
            length: payload.len() as u32,
            payload,
        })
    }

    /// Serialize frame to bytes (length prefix + payload)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + self.payload.len());
        buf.extend_from_slice(&self.length.to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Parse frame from bytes
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 4 {
            return None;
        }

        let length = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;

        if data.len() < 4 + length {
            return None;
        }

        Some(Self {
            length: length as u32,
            payload: data[4..4 + length].to_vec(),
        })
    }
}

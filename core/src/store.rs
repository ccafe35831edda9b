/// Conversation and message store
///
/// All mutations go through one write lock, so concurrent appends and
/// read-marking against the same conversation are serialized.
use crate::error::{ChatError, Result};
use crate::types::{DeliveryStatus, UserProfile, VanishOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// A single chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique within the owning conversation
    pub id: String,
    pub sender_id: String,
    pub text: String,
    /// Unix milliseconds, strictly increasing within a conversation
    pub timestamp: i64,
    pub is_read: bool,
    /// True only when the sender is premium and requested vanish
    pub is_vanished: bool,
    /// Countdown in seconds, present iff `is_vanished`
    pub vanish_after: Option<u32>,
    /// Set once the vanish countdown crosses zero; never cleared.
    /// The message stays in the log, it is only dropped from rendering.
    pub hidden: bool,
    pub delivery: DeliveryStatus,
}

/// A two-party message thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub participants: [String; 2],
    pub messages: Vec<Message>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub is_active: bool,
}

impl Conversation {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    /// The other party's id
    pub fn peer_of(&self, user_id: &str) -> Option<&str> {
        self.participants
            .iter()
            .find(|p| *p != user_id)
            .map(|s| s.as_str())
    }
}

/// Shared, clonable message store
#[derive(Clone)]
pub struct ChatStore {
    conversations: Arc<RwLock<HashMap<String, Conversation>>>,
}

impl ChatStore {
    pub fn new() -> Self {
        Self {
            conversations: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a conversation between two distinct users
    pub async fn create_conversation(&self, user_a: &str, user_b: &str) -> Result<Conversation> {
        if user_a == user_b {
            return Err(ChatError::InvalidPairing);
        }

        let now = chrono::Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            participants: [user_a.to_string(), user_b.to_string()],
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            is_active: true,
        };

        let mut conversations = self.conversations.write().await;
        conversations.insert(conversation.id.clone(), conversation.clone());
        debug!("Created conversation {} ({} <-> {})", conversation.id, user_a, user_b);
        Ok(conversation)
    }

    /// Append an outbound message, assigning id and timestamp.
    ///
    /// A vanish request from a non-premium sender is rejected with
    /// `PermissionDenied` instead of being silently dropped.
    pub async fn append_message(
        &self,
        conversation_id: &str,
        sender: &UserProfile,
        text: &str,
        vanish: VanishOptions,
        default_vanish_secs: u32,
    ) -> Result<Message> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyText);
        }
        if vanish.vanish && !sender.is_premium {
            return Err(ChatError::PermissionDenied);
        }

        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .get_mut(conversation_id)
            .ok_or_else(|| ChatError::UnknownConversation(conversation_id.to_string()))?;

        if !conversation.has_participant(&sender.id) {
            return Err(ChatError::NotParticipant(sender.id.clone()));
        }
        if !conversation.is_active {
            return Err(ChatError::ConversationInactive);
        }

        let vanish_after = if vanish.vanish {
            Some(vanish.after_secs.unwrap_or(default_vanish_secs).max(1))
        } else {
            None
        };

        let message = Message {
            id: Uuid::new_v4().to_string(),
            sender_id: sender.id.clone(),
            text: text.to_string(),
            timestamp: Self::next_timestamp(conversation),
            is_read: false,
            is_vanished: vanish_after.is_some(),
            vanish_after,
            hidden: false,
            delivery: DeliveryStatus::Pending,
        };

        conversation.messages.push(message.clone());
        conversation.updated_at = chrono::Utc::now();
        Ok(message)
    }

    /// Apply an inbound message from the transport.
    ///
    /// Idempotent on message id: an echo of a locally pending message
    /// upgrades its delivery status instead of double-inserting. Returns
    /// the applied message only when it was actually inserted.
    pub async fn apply_inbound(
        &self,
        conversation_id: &str,
        mut message: Message,
    ) -> Result<Option<Message>> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .get_mut(conversation_id)
            .ok_or_else(|| ChatError::UnknownConversation(conversation_id.to_string()))?;

        if let Some(existing) = conversation.messages.iter_mut().find(|m| m.id == message.id) {
            existing.delivery = DeliveryStatus::Delivered;
            debug!("Echo reconciled for message {}", message.id);
            return Ok(None);
        }

        if !conversation.has_participant(&message.sender_id) {
            return Err(ChatError::NotParticipant(message.sender_id));
        }

        // Keep per-conversation timestamps non-decreasing even when the
        // sender's clock is behind ours
        message.timestamp = message
            .timestamp
            .max(Self::next_timestamp(conversation));
        message.delivery = DeliveryStatus::Delivered;
        message.hidden = false;

        conversation.messages.push(message.clone());
        conversation.updated_at = chrono::Utc::now();
        Ok(Some(message))
    }

    /// Mark every message not sent by `reader_id` as read. Idempotent.
    pub async fn mark_read(&self, conversation_id: &str, reader_id: &str) -> Result<usize> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .get_mut(conversation_id)
            .ok_or_else(|| ChatError::UnknownConversation(conversation_id.to_string()))?;

        let mut flipped = 0;
        for message in &mut conversation.messages {
            if message.sender_id != reader_id && !message.is_read {
                message.is_read = true;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    /// End a conversation. Messages are kept; returns the previous
    /// active flag so callers can tell a no-op apart. Idempotent.
    pub async fn end_conversation(&self, conversation_id: &str) -> Result<bool> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .get_mut(conversation_id)
            .ok_or_else(|| ChatError::UnknownConversation(conversation_id.to_string()))?;

        let was_active = conversation.is_active;
        conversation.is_active = false;
        Ok(was_active)
    }

    /// Update the delivery status of a message
    pub async fn set_delivery(
        &self,
        conversation_id: &str,
        message_id: &str,
        delivery: DeliveryStatus,
    ) -> Result<()> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .get_mut(conversation_id)
            .ok_or_else(|| ChatError::UnknownConversation(conversation_id.to_string()))?;

        if let Some(message) = conversation.messages.iter_mut().find(|m| m.id == message_id) {
            message.delivery = delivery;
        }
        Ok(())
    }

    /// Flip a vanish-flagged message to hidden. One-way: returns true only
    /// on the first visible -> hidden transition. Tolerates the conversation
    /// or message being gone already.
    pub async fn hide_message(&self, conversation_id: &str, message_id: &str) -> bool {
        let mut conversations = self.conversations.write().await;
        let Some(conversation) = conversations.get_mut(conversation_id) else {
            return false;
        };
        let Some(message) = conversation.messages.iter_mut().find(|m| m.id == message_id) else {
            return false;
        };
        if !message.is_vanished || message.hidden {
            return false;
        }
        message.hidden = true;
        true
    }

    /// Get a conversation snapshot
    pub async fn conversation(&self, conversation_id: &str) -> Option<Conversation> {
        let conversations = self.conversations.read().await;
        conversations.get(conversation_id).cloned()
    }

    /// Messages still visible to a viewer (vanished ones filtered out)
    pub async fn visible_messages(&self, conversation_id: &str) -> Vec<Message> {
        let conversations = self.conversations.read().await;
        conversations
            .get(conversation_id)
            .map(|c| c.messages.iter().filter(|m| !m.hidden).cloned().collect())
            .unwrap_or_default()
    }

    /// Drop a conversation entirely (client disconnect GC)
    pub async fn remove_conversation(&self, conversation_id: &str) -> bool {
        let mut conversations = self.conversations.write().await;
        conversations.remove(conversation_id).is_some()
    }

    /// Ids of all stored conversations
    pub async fn conversation_ids(&self) -> Vec<String> {
        let conversations = self.conversations.read().await;
        conversations.keys().cloned().collect()
    }

    fn next_timestamp(conversation: &Conversation) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        match conversation.messages.last() {
            Some(last) => now.max(last.timestamp + 1),
            None => now,
        }
    }
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Conversation session: the core API surface for UI callers
///
/// Owns the store, presence tracker, vanish engine, and transport adapter
/// for one local user. Outbound sends append an optimistic message before
/// the transport emit; inbound echoes reconcile against it by message id.
use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::presence::PresenceTracker;
use crate::responder::PeerResponder;
use crate::store::{ChatStore, Conversation, Message};
use crate::transport::{TransportAdapter, TransportEvent, WireEvent};
use crate::types::{ChatEvent, DeliveryStatus, UserProfile, VanishOptions};
use crate::vanish::VanishEngine;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 256;

pub struct ChatSession {
    /// Local user identity, injected by the caller (auth is external)
    user: UserProfile,
    config: Config,
    store: ChatStore,
    presence: PresenceTracker,
    vanish: VanishEngine,
    transport: TransportAdapter,
    events: broadcast::Sender<ChatEvent>,
    current_conversation: Arc<RwLock<Option<String>>>,
    /// Profiles of peers we have been paired with, keyed by user id
    peers: Arc<RwLock<HashMap<String, UserProfile>>>,
    responder: Option<Arc<dyn PeerResponder>>,
    inbound_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ChatSession {
    pub fn new(user: UserProfile, config: Config) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let store = ChatStore::new();
        let vanish = VanishEngine::new(store.clone(), events.clone());
        let transport = TransportAdapter::new(config.clone());

        Self {
            user,
            config,
            store,
            presence: PresenceTracker::new(),
            vanish,
            transport,
            events,
            current_conversation: Arc::new(RwLock::new(None)),
            peers: Arc::new(RwLock::new(HashMap::new())),
            responder: None,
            inbound_task: Arc::new(Mutex::new(None)),
        }
    }

    /// Install a peer response generator (mock/demo collaborator)
    pub fn with_responder(mut self, responder: Arc<dyn PeerResponder>) -> Self {
        self.responder = Some(responder);
        self
    }

    /// Subscribe to real-time events
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    // ─── Connection lifecycle ────────────────────────────────────────────

    /// Connect the transport and start draining inbound events
    pub async fn connect(&self) -> Result<()> {
        let inbound_rx = self.transport.connect(&self.user.id).await?;
        info!("Session for {} connected", self.user.id);

        let session = self.clone();
        let handle = tokio::spawn(async move {
            session.run_inbound(inbound_rx).await;
        });

        let mut task = self.inbound_task.lock().await;
        if let Some(old) = task.replace(handle) {
            old.abort();
        }
        Ok(())
    }

    /// Tear everything down: transport, timers, presence, conversations.
    /// Conversations are garbage-collected here, not on end_conversation.
    pub async fn disconnect(&self) {
        self.transport.disconnect().await;
        self.vanish.cancel_all().await;
        self.presence.clear().await;

        for id in self.store.conversation_ids().await {
            self.store.remove_conversation(&id).await;
        }
        {
            let mut current = self.current_conversation.write().await;
            current.take();
        }

        let mut task = self.inbound_task.lock().await;
        if let Some(handle) = task.take() {
            handle.abort();
        }

        let _ = self.events.send(ChatEvent::Disconnected);
        info!("Session for {} disconnected", self.user.id);
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    // ─── Conversation lifecycle ──────────────────────────────────────────

    /// Open a conversation with a known peer and make it current
    pub async fn create_conversation(&self, peer: &UserProfile) -> Result<Conversation> {
        let conversation = self
            .store
            .create_conversation(&self.user.id, &peer.id)
            .await?;

        {
            let mut peers = self.peers.write().await;
            peers.insert(peer.id.clone(), peer.clone());
        }
        {
            let mut current = self.current_conversation.write().await;
            *current = Some(conversation.id.clone());
        }

        if let Some(responder) = &self.responder {
            if let Some(reply) = responder.greeting() {
                self.spawn_peer_reply(conversation.id.clone(), peer.id.clone(), reply);
            }
        }

        Ok(conversation)
    }

    /// Pair with a random peer from a roster, excluding ourselves
    pub async fn pair_random(&self, roster: &[UserProfile]) -> Result<Conversation> {
        let candidates: Vec<&UserProfile> =
            roster.iter().filter(|u| u.id != self.user.id).collect();
        let peer = {
            let mut rng = rand::thread_rng();
            candidates
                .choose(&mut rng)
                .copied()
                .ok_or(ChatError::InvalidPairing)?
                .clone()
        };
        debug!("Paired {} with {}", self.user.id, peer.id);
        self.create_conversation(&peer).await
    }

    /// End the current conversation; messages stay in the log
    pub async fn end_conversation(&self, conversation_id: &str) -> Result<()> {
        self.store.end_conversation(conversation_id).await?;
        let mut current = self.current_conversation.write().await;
        if current.as_deref() == Some(conversation_id) {
            current.take();
        }
        Ok(())
    }

    // ─── Messaging ───────────────────────────────────────────────────────

    /// Optimistic send over the current conversation. The message is
    /// appended before the emit; a failed emit keeps it, flagged Failed.
    pub async fn send(&self, text: &str, vanish: VanishOptions) -> Result<Message> {
        let conversation_id = self
            .current_conversation_id()
            .await
            .ok_or_else(|| ChatError::UnknownConversation("no current conversation".into()))?;

        let message = self
            .store
            .append_message(
                &conversation_id,
                &self.user,
                text,
                vanish,
                self.config.default_vanish_secs,
            )
            .await?;

        if message.is_vanished {
            self.vanish.schedule(&conversation_id, &message).await;
        }

        let wire = WireEvent::Message {
            id: message.id.clone(),
            sender_id: message.sender_id.clone(),
            text: message.text.clone(),
            timestamp: message.timestamp,
            is_read: false,
            is_vanished: message.is_vanished,
            vanish_after: message.vanish_after,
        };

        match self.transport.send(wire).await {
            Ok(()) => {
                self.store
                    .set_delivery(&conversation_id, &message.id, DeliveryStatus::Sent)
                    .await?;
            }
            Err(e) => {
                warn!("Send failed for message {}: {}", message.id, e);
                self.store
                    .set_delivery(&conversation_id, &message.id, DeliveryStatus::Failed)
                    .await?;
                let _ = self.events.send(ChatEvent::MessageFailed {
                    message_id: message.id.clone(),
                });
                return Err(e);
            }
        }

        if let Some(responder) = &self.responder {
            if let Some(reply) = responder.reply_to(text) {
                if let Some(conversation) = self.store.conversation(&conversation_id).await {
                    if let Some(peer_id) = conversation.peer_of(&self.user.id) {
                        self.spawn_peer_reply(
                            conversation_id.clone(),
                            peer_id.to_string(),
                            reply,
                        );
                    }
                }
            }
        }

        Ok(message)
    }

    /// Mark everything the peer sent as read. Idempotent.
    pub async fn mark_read(&self, conversation_id: &str) -> Result<usize> {
        self.store.mark_read(conversation_id, &self.user.id).await
    }

    /// Emit our typing state; fire-and-forget
    pub async fn set_typing(&self, typing: bool) -> Result<()> {
        self.transport.send(WireEvent::Typing { typing }).await
    }

    // ─── Read accessors ──────────────────────────────────────────────────

    pub async fn current_conversation_id(&self) -> Option<String> {
        self.current_conversation.read().await.clone()
    }

    pub async fn conversation(&self, conversation_id: &str) -> Option<Conversation> {
        self.store.conversation(conversation_id).await
    }

    /// Messages not yet vanished from view
    pub async fn visible_messages(&self, conversation_id: &str) -> Vec<Message> {
        self.store.visible_messages(conversation_id).await
    }

    pub async fn online_users(&self) -> Vec<String> {
        self.presence.online_users().await
    }

    pub async fn is_typing(&self) -> bool {
        self.presence.is_typing().await
    }

    /// Profile of a peer we have been paired with
    pub async fn peer_profile(&self, user_id: &str) -> Option<UserProfile> {
        let peers = self.peers.read().await;
        peers.get(user_id).cloned()
    }

    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    // ─── Inbound event handling ──────────────────────────────────────────

    async fn run_inbound(&self, mut inbound_rx: mpsc::UnboundedReceiver<TransportEvent>) {
        while let Some(event) = inbound_rx.recv().await {
            match event {
                TransportEvent::Connected => {
                    let _ = self.events.send(ChatEvent::Connected);
                }
                TransportEvent::Disconnected => {
                    // Reconnect budget exhausted; no stale presence survives
                    self.presence.clear().await;
                    let _ = self.events.send(ChatEvent::Disconnected);
                }
                TransportEvent::Inbound(wire) => self.handle_wire_event(wire).await,
            }
        }
        debug!("Inbound loop for {} ended", self.user.id);
    }

    async fn handle_wire_event(&self, wire: WireEvent) {
        match wire {
            WireEvent::Message {
                id,
                sender_id,
                text,
                timestamp,
                is_read,
                is_vanished,
                vanish_after,
            } => {
                let Some(conversation_id) = self.current_conversation_id().await else {
                    debug!("Dropping inbound message {} with no open conversation", id);
                    return;
                };

                let wire_id = id.clone();
                let message = Message {
                    id,
                    sender_id,
                    text,
                    timestamp,
                    is_read,
                    is_vanished,
                    vanish_after,
                    hidden: false,
                    delivery: DeliveryStatus::Delivered,
                };

                match self.store.apply_inbound(&conversation_id, message).await {
                    Ok(Some(inserted)) => {
                        // A real message from the peer clears the typing flag
                        self.presence.set_typing(false).await;
                        let _ = self.events.send(ChatEvent::TypingChanged { typing: false });
                        if inserted.is_vanished {
                            self.vanish.schedule(&conversation_id, &inserted).await;
                        }
                        let _ = self.events.send(ChatEvent::MessageReceived {
                            conversation_id,
                            message_id: inserted.id,
                        });
                    }
                    Ok(None) => {
                        // Echo of our own optimistic append
                        let _ = self.events.send(ChatEvent::MessageDelivered {
                            message_id: wire_id,
                        });
                    }
                    Err(e) => warn!("Dropping inbound message: {}", e),
                }
            }
            WireEvent::Typing { typing } => {
                self.presence.set_typing(typing).await;
                let _ = self.events.send(ChatEvent::TypingChanged { typing });
            }
            WireEvent::OnlineUsers { users } => {
                self.presence.replace_online(users.clone()).await;
                let _ = self.events.send(ChatEvent::PresenceChanged { online: users });
            }
            WireEvent::Auth { user_id } => {
                debug!("Ignoring unexpected auth event for {}", user_id);
            }
        }
    }

    /// The mocked peer types for a while, then its message lands inbound
    fn spawn_peer_reply(
        &self,
        conversation_id: String,
        peer_id: String,
        reply: crate::responder::ResponderReply,
    ) {
        let session = self.clone();
        tokio::spawn(async move {
            session.presence.set_typing(true).await;
            let _ = session.events.send(ChatEvent::TypingChanged { typing: true });

            sleep(reply.delay).await;

            let message = Message {
                id: Uuid::new_v4().to_string(),
                sender_id: peer_id,
                text: reply.text,
                timestamp: chrono::Utc::now().timestamp_millis(),
                is_read: false,
                is_vanished: false,
                vanish_after: None,
                hidden: false,
                delivery: DeliveryStatus::Delivered,
            };

            match session.store.apply_inbound(&conversation_id, message).await {
                Ok(Some(inserted)) => {
                    session.presence.set_typing(false).await;
                    let _ = session.events.send(ChatEvent::TypingChanged { typing: false });
                    let _ = session.events.send(ChatEvent::MessageReceived {
                        conversation_id,
                        message_id: inserted.id,
                    });
                }
                Ok(None) => {}
                Err(e) => debug!("Peer reply dropped: {}", e),
            }
        });
    }
}

impl Clone for ChatSession {
    fn clone(&self) -> Self {
        Self {
            user: self.user.clone(),
            config: self.config.clone(),
            store: self.store.clone(),
            presence: self.presence.clone(),
            vanish: self.vanish.clone(),
            transport: self.transport.clone(),
            events: self.events.clone(),
            current_conversation: self.current_conversation.clone(),
            peers: self.peers.clone(),
            responder: self.responder.clone(),
            inbound_task: self.inbound_task.clone(),
        }
    }
}

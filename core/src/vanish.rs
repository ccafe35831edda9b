/// Vanish countdown engine
///
/// Each vanish-flagged message gets an independent ticking task. The
/// remaining time is always derived from the message's creation timestamp,
/// so cancelling and re-scheduling (a view remount) never restarts the
/// countdown from the original duration.
use crate::store::{ChatStore, Message};
use crate::types::ChatEvent;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// Seconds left before a message hides, derived from wall-clock elapsed
/// time since creation. Zero once the deadline has passed.
pub fn remaining_secs(timestamp_ms: i64, vanish_after: u32, now_ms: i64) -> u32 {
    let deadline = timestamp_ms + i64::from(vanish_after) * 1000;
    let left_ms = deadline - now_ms;
    if left_ms <= 0 {
        0
    } else {
        // Round up so a freshly created message reports its full countdown
        ((left_ms + 999) / 1000) as u32
    }
}

type TimerKey = (String, String);

/// Schedules and cancels per-message countdown tasks
#[derive(Clone)]
pub struct VanishEngine {
    store: ChatStore,
    events: broadcast::Sender<ChatEvent>,
    timers: Arc<Mutex<HashMap<TimerKey, JoinHandle<()>>>>,
}

impl VanishEngine {
    pub fn new(store: ChatStore, events: broadcast::Sender<ChatEvent>) -> Self {
        Self {
            store,
            events,
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start (or restart) the countdown task for a vanish message.
    /// Re-scheduling replaces the task but keeps the original deadline.
    pub async fn schedule(&self, conversation_id: &str, message: &Message) {
        let Some(vanish_after) = message.vanish_after else {
            return;
        };
        if !message.is_vanished || message.hidden {
            return;
        }

        let key = (conversation_id.to_string(), message.id.clone());
        let mut timers = self.timers.lock().await;
        if let Some(old) = timers.remove(&key) {
            old.abort();
        }

        let store = self.store.clone();
        let events = self.events.clone();
        let timers_ref = self.timers.clone();
        let conv_id = conversation_id.to_string();
        let msg_id = message.id.clone();
        let created = message.timestamp;

        let handle = tokio::spawn(async move {
            let mut tick = interval(Duration::from_secs(1));
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First tick of a tokio interval fires immediately
            tick.tick().await;

            loop {
                let now = chrono::Utc::now().timestamp_millis();
                let remaining = remaining_secs(created, vanish_after, now);
                if remaining == 0 {
                    break;
                }
                let _ = events.send(ChatEvent::VanishTick {
                    conversation_id: conv_id.clone(),
                    message_id: msg_id.clone(),
                    remaining,
                });
                tick.tick().await;
            }

            // The conversation may have ended or been collected; hide_message
            // checks existence and fires the one-way transition at most once
            if store.hide_message(&conv_id, &msg_id).await {
                debug!("Message {} vanished", msg_id);
                let _ = events.send(ChatEvent::MessageVanished {
                    conversation_id: conv_id.clone(),
                    message_id: msg_id.clone(),
                });
            }

            let mut timers = timers_ref.lock().await;
            timers.remove(&(conv_id, msg_id));
        });

        timers.insert(key, handle);
    }

    /// Discard the countdown task without touching the stored message
    pub async fn cancel(&self, conversation_id: &str, message_id: &str) {
        let mut timers = self.timers.lock().await;
        if let Some(handle) = timers.remove(&(conversation_id.to_string(), message_id.to_string()))
        {
            handle.abort();
        }
    }

    /// Abort every running countdown (session teardown)
    pub async fn cancel_all(&self) {
        let mut timers = self.timers.lock().await;
        for (_, handle) in timers.drain() {
            handle.abort();
        }
    }

    /// Number of live countdown tasks
    pub async fn active_timers(&self) -> usize {
        self.timers.lock().await.len()
    }
}

/// Presence and typing state
///
/// The online set is replaced wholesale on every snapshot event from the
/// server; there is no incremental merge, so two racing snapshots resolve
/// as last-write-wins. The typing flag is a single boolean for the active
/// conversation, not per-user.
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct PresenceState {
    online: HashSet<String>,
    typing: bool,
}

#[derive(Clone, Default)]
pub struct PresenceTracker {
    state: Arc<RwLock<PresenceState>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole online set with the latest snapshot
    pub async fn replace_online(&self, user_ids: Vec<String>) {
        let mut state = self.state.write().await;
        state.online = user_ids.into_iter().collect();
    }

    pub async fn is_online(&self, user_id: &str) -> bool {
        let state = self.state.read().await;
        state.online.contains(user_id)
    }

    pub async fn online_users(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut users: Vec<String> = state.online.iter().cloned().collect();
        users.sort();
        users
    }

    pub async fn set_typing(&self, typing: bool) {
        let mut state = self.state.write().await;
        state.typing = typing;
    }

    pub async fn is_typing(&self) -> bool {
        let state = self.state.read().await;
        state.typing
    }

    /// Wipe everything; no stale presence may survive a disconnect
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.online.clear();
        state.typing = false;
    }
}

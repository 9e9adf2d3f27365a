//! Connection registry: a process-wide username → live-session multimap.
//! Backed by `DashMap` so lookups and fan-out tolerate concurrent
//! insert/remove without a global lock.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;

use crate::codec::ServerMessage;
use crate::session::ConnInfo;

/// One live session's outbound handle: enough to push a message onto its
/// connection's FIFO queue, plus a handle to its subscription state for
/// fan-out filtering. The paired `Option<String>` is the correlation id;
/// broadcasts and fan-out always carry `None`.
#[derive(Clone)]
pub struct SessionHandle {
    pub conn_id: uuid::Uuid,
    pub info: Arc<ConnInfo>,
    pub sender: UnboundedSender<(ServerMessage, Option<String>)>,
}

#[derive(Default)]
pub struct Registry {
    sessions: DashMap<String, Vec<SessionHandle>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent insert: re-adding the same connection id for a user is a no-op.
    pub fn put(&self, username: &str, handle: SessionHandle) {
        let mut entry = self.sessions.entry(username.to_string()).or_default();
        if !entry.iter().any(|h| h.conn_id == handle.conn_id) {
            entry.push(handle);
        }
    }

    /// Idempotent delete.
    pub fn remove(&self, username: &str, conn_id: uuid::Uuid) {
        if let Some(mut entry) = self.sessions.get_mut(username) {
            entry.retain(|h| h.conn_id != conn_id);
            if entry.is_empty() {
                drop(entry);
                self.sessions.remove(username);
            }
        }
    }

    pub fn is_online(&self, username: &str) -> bool {
        self.sessions.get(username).map(|e| !e.is_empty()).unwrap_or(false)
    }

    /// Snapshot of a user's live sessions; tolerates concurrent mutation
    /// during iteration since the clone happens up front.
    pub fn sessions_of(&self, username: &str) -> Vec<SessionHandle> {
        self.sessions.get(username).map(|e| e.clone()).unwrap_or_default()
    }

    pub fn send_to_user(&self, username: &str, message: ServerMessage) {
        for handle in self.sessions_of(username) {
            let _ = handle.sender.send((message.clone(), None));
        }
    }

    /// Broadcasts to every live session of every user.
    pub fn broadcast(&self, message: ServerMessage) {
        let snapshot: Vec<SessionHandle> =
            self.sessions.iter().flat_map(|e| e.value().clone()).collect();
        for handle in snapshot {
            let _ = handle.sender.send((message.clone(), None));
        }
    }

    /// Broadcasts only to sessions currently subscribed to `channel`.
    pub fn broadcast_to_subscribers(&self, channel: &str, message: ServerMessage) {
        let snapshot: Vec<SessionHandle> =
            self.sessions.iter().flat_map(|e| e.value().clone()).collect();
        for handle in snapshot {
            if handle.info.is_subscribed(channel) {
                let _ = handle.sender.send((message.clone(), None));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;
    use uuid::Uuid;

    #[test]
    fn put_remove_idempotent() {
        let registry = Registry::new();
        let (tx, _rx) = unbounded_channel();
        let conn_id = Uuid::new_v4();
        let handle = SessionHandle { conn_id, info: Arc::new(ConnInfo::default()), sender: tx };

        registry.put("alice", handle.clone());
        registry.put("alice", handle.clone());
        assert_eq!(registry.sessions_of("alice").len(), 1);

        registry.remove("alice", conn_id);
        registry.remove("alice", conn_id);
        assert!(!registry.is_online("alice"));
    }

    #[test]
    fn broadcast_reaches_every_session() {
        let registry = Registry::new();
        let (tx1, mut rx1) = unbounded_channel();
        let (tx2, mut rx2) = unbounded_channel();
        registry.put("a", SessionHandle { conn_id: Uuid::new_v4(), info: Arc::new(ConnInfo::default()), sender: tx1 });
        registry.put("b", SessionHandle { conn_id: Uuid::new_v4(), info: Arc::new(ConnInfo::default()), sender: tx2 });

        registry.broadcast(ServerMessage::UserQuit { username: "a".into() });

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn broadcast_to_subscribers_filters_by_channel() {
        let registry = Registry::new();
        let (tx1, mut rx1) = unbounded_channel();
        let (tx2, mut rx2) = unbounded_channel();
        let subscribed_info = Arc::new(ConnInfo::default());
        subscribed_info.subscribe("general");

        registry.put("a", SessionHandle { conn_id: Uuid::new_v4(), info: subscribed_info, sender: tx1 });
        registry.put("b", SessionHandle { conn_id: Uuid::new_v4(), info: Arc::new(ConnInfo::default()), sender: tx2 });

        registry.broadcast_to_subscribers("general", ServerMessage::DeleteChannel { name: "general".into() });

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }
}

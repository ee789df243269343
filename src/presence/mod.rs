//! Process-local presence: which identity is reachable through which socket.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::{chat::ServerEvent, AppError, AppResult};

pub type ConnectionId = Uuid;

/// One live transport session. Clones share the same outbound channel and
/// compare equal by id.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    /// Opens a handle together with the receiving end the socket writer drains.
    pub fn open() -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { id: Uuid::now_v7(), tx }, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn push(&self, event: ServerEvent) -> AppResult<()> {
        self.tx.send(event).map_err(|_| AppError::delivery(self.id))
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

#[derive(Debug, Clone)]
pub struct ParticipantConnection {
    pub identity: String,
    pub role: String,
    pub connection: ConnectionHandle,
}

/// Identity -> live connection map. At most one entry per identity; the last
/// `register` wins.
#[derive(Clone, Default)]
pub struct PresenceRegistry {
    entries: Arc<RwLock<HashMap<String, ParticipantConnection>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, identity: String, role: String, connection: ConnectionHandle) {
        let entry = ParticipantConnection {
            identity: identity.clone(),
            role,
            connection,
        };
        self.entries.write().await.insert(identity, entry);
    }

    pub async fn lookup(&self, identity: &str) -> Option<ParticipantConnection> {
        self.entries.read().await.get(identity).cloned()
    }

    /// Drops every identity bound to `connection` and returns them.
    /// Unknown handles are a no-op.
    pub async fn remove_by_connection(&self, connection: &ConnectionHandle) -> Vec<String> {
        let mut entries = self.entries.write().await;
        let mut removed = Vec::new();
        entries.retain(|identity, entry| {
            if entry.connection == *connection {
                removed.push(identity.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_of_unknown_identity_is_none() {
        let registry = PresenceRegistry::new();
        assert!(registry.lookup("nobody").await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn last_register_wins() {
        let registry = PresenceRegistry::new();
        let (first, _rx1) = ConnectionHandle::open();
        let (second, _rx2) = ConnectionHandle::open();

        registry.register("alice".into(), "patient".into(), first.clone()).await;
        registry.register("alice".into(), "doctor".into(), second.clone()).await;

        let entry = registry.lookup("alice").await.unwrap();
        assert_eq!(entry.connection, second);
        assert_ne!(entry.connection, first);
        assert_eq!(entry.role, "doctor");
        assert_eq!(entry.identity, "alice");
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn remove_by_connection_is_idempotent() {
        let registry = PresenceRegistry::new();
        let (alice, _rx1) = ConnectionHandle::open();
        let (bob, _rx2) = ConnectionHandle::open();
        registry.register("alice".into(), "user".into(), alice.clone()).await;
        registry.register("bob".into(), "user".into(), bob.clone()).await;

        assert_eq!(registry.remove_by_connection(&alice).await, vec!["alice".to_string()]);
        assert!(registry.remove_by_connection(&alice).await.is_empty());

        assert!(registry.lookup("alice").await.is_none());
        assert_eq!(registry.lookup("bob").await.unwrap().connection, bob);
    }

    #[tokio::test]
    async fn stale_handle_disconnect_keeps_newer_registration() {
        let registry = PresenceRegistry::new();
        let (old, _rx1) = ConnectionHandle::open();
        let (new, _rx2) = ConnectionHandle::open();
        registry.register("alice".into(), "user".into(), old.clone()).await;
        registry.register("alice".into(), "user".into(), new.clone()).await;

        assert!(registry.remove_by_connection(&old).await.is_empty());
        assert_eq!(registry.lookup("alice").await.unwrap().connection, new);
    }

    #[tokio::test]
    async fn one_handle_can_hold_several_identities() {
        let registry = PresenceRegistry::new();
        let (shared, _rx) = ConnectionHandle::open();
        registry.register("alice".into(), "user".into(), shared.clone()).await;
        registry.register("bob".into(), "user".into(), shared.clone()).await;

        let mut removed = registry.remove_by_connection(&shared).await;
        removed.sort();
        assert_eq!(removed, vec!["alice".to_string(), "bob".to_string()]);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn push_to_closed_handle_fails() {
        let (handle, rx) = ConnectionHandle::open();
        drop(rx);
        let err = handle.push(ServerEvent::error("gone")).unwrap_err();
        assert!(err.to_string().contains(&handle.id().to_string()), "{err}");
    }
}

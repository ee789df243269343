use tokio::task::JoinHandle;

use crate::{
    db::MessageStore,
    presence::{ConnectionHandle, PresenceRegistry},
    AppResult,
};

use super::events::{IncomingMessage, ServerEvent};

/// What happened to a message after it was stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Receiver was registered and the push went out.
    Delivered,
    /// Receiver was offline; the message waits for their next history load.
    Stored,
    /// Receiver was registered but their connection rejected the push.
    Undelivered,
}

#[derive(Clone)]
pub struct ConversationService {
    registry: PresenceRegistry,
    store: MessageStore,
}

impl ConversationService {
    pub fn new(registry: PresenceRegistry, store: MessageStore) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> &PresenceRegistry {
        &self.registry
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub async fn register(&self, connection: &ConnectionHandle, identity: String, role: String) {
        tracing::info!(%identity, %role, connection = %connection.id(), "participant registered");
        self.registry.register(identity, role, connection.clone()).await;
    }

    /// Sends the full history between the two participants to `connection`,
    /// then marks the counterpart's messages to the requester as read in the
    /// background.
    ///
    /// Nothing is pushed if the history query fails. The returned task logs
    /// its own failure; dropping it detaches it.
    pub async fn open_conversation(
        &self,
        connection: &ConnectionHandle,
        requester: &str,
        counterpart: &str,
    ) -> AppResult<JoinHandle<()>> {
        let history = self.store.history(requester, counterpart).await?;
        tracing::info!(requester, counterpart, messages = history.len(), "sending chat history");

        if let Err(err) = connection.push(ServerEvent::ChatHistory(history)) {
            tracing::warn!(%err, requester, "chat history not delivered");
        }

        let store = self.store.clone();
        let receiver = requester.to_owned();
        let sender = counterpart.to_owned();
        Ok(tokio::spawn(async move {
            match store.mark_read(&receiver, &sender).await {
                Ok(updated) => tracing::debug!(%receiver, %sender, updated, "messages marked read"),
                Err(err) => tracing::error!(%err, %receiver, %sender, "failed to mark messages read"),
            }
        }))
    }

    /// Persists the message, then pushes it to the receiver if they were
    /// registered when the send began. A failed insert stops before delivery.
    pub async fn send_message(&self, sender: &str, receiver: &str, body: &str) -> AppResult<SendOutcome> {
        let presence = self.registry.lookup(receiver).await;

        let stored = self.store.insert(sender, receiver, body, presence.is_some()).await?;
        tracing::info!(sender, receiver, read = stored.read, "message stored");
        tracing::debug!(sender, receiver, body, "message body");

        let Some(presence) = presence else {
            return Ok(SendOutcome::Stored);
        };

        let event = ServerEvent::ReceiveMessage(IncomingMessage {
            sender_id: stored.sender_id,
            message: stored.body,
        });
        match presence.connection.push(event) {
            Ok(()) => Ok(SendOutcome::Delivered),
            Err(err) => {
                tracing::warn!(%err, receiver, "live delivery failed, message kept for history");
                Ok(SendOutcome::Undelivered)
            }
        }
    }

    pub async fn disconnect(&self, connection: &ConnectionHandle) {
        let removed = self.registry.remove_by_connection(connection).await;
        tracing::info!(connection = %connection.id(), ?removed, "connection closed");
    }
}

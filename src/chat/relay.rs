//! The relay router: decides where each event goes.
//!
//! Owns no state of its own; it orchestrates the presence registry and the
//! message store. Per-connection ordering comes from the caller (the
//! websocket loop handles one inbound event to completion before reading
//! the next), so no extra locking happens here.

use tracing::{debug, info};

use crate::presence::{ConnectionId, Peer, Presence};

use super::event::ServerEvent;
use super::store::{MessageStore, StoreError, format_timestamp};

#[derive(Clone)]
pub struct Relay {
    presence: Presence,
    store: MessageStore,
}

impl Relay {
    pub fn new(presence: Presence, store: MessageStore) -> Self {
        Self { presence, store }
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// A connection was authenticated. Register it and tell everyone who is
    /// online now, the new connection included.
    pub fn on_connect(&self, username: &str, peer: Peer) {
        let users = self.presence.register(username, peer);
        info!(username, online = users.len(), "user connected");
        self.presence.broadcast(&ServerEvent::UserList { users });
    }

    pub fn on_disconnect(&self, id: ConnectionId) {
        let users = self.presence.unregister(id);
        info!(online = users.len(), "connection closed");
        self.presence.broadcast(&ServerEvent::UserList { users });
    }

    /// Persist, then deliver. A persist failure aborts the whole operation;
    /// nothing undurable ever reaches a recipient. On success the payload
    /// goes to the receiver if they are online, and unconditionally back to
    /// the originating connection so the sender's own view stays complete.
    pub async fn on_private_message(
        &self,
        sender: &str,
        origin: &Peer,
        receiver: &str,
        body: String,
    ) -> Result<(), StoreError> {
        let created_at = self.store.persist(sender, receiver, &body).await?;
        let payload = ServerEvent::PrivateMessage {
            sender: sender.to_owned(),
            body,
            created_at: format_timestamp(created_at),
        };

        match self.presence.lookup(receiver) {
            Some(peer) => peer.send(payload.clone()),
            None => debug!(receiver, "recipient offline, message stored only"),
        }
        origin.send(payload);
        Ok(())
    }

    /// Typing signals are ephemeral: forwarded if the receiver is online,
    /// silently dropped otherwise. Never persisted, never an error.
    pub fn on_typing(&self, sender: &str, receiver: &str, stop: bool) {
        if let Some(peer) = self.presence.lookup(receiver) {
            peer.send(ServerEvent::Typing { sender: sender.to_owned(), stop });
        }
    }

    /// Mark messages `other` sent to `current` as read. Always that
    /// direction, never the reverse.
    pub async fn on_mark_read(&self, current: &str, other: &str) -> Result<u64, StoreError> {
        self.store.mark_read(other, current).await
    }
}

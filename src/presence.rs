//! Who is online, and how to reach them.
//!
//! The registry is the only shared mutable state in the relay. It owns the
//! `username -> peer` map behind a single mutex; everything else calls its
//! operations and never touches the map directly. The lock is never held
//! across an await point.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::chat::event::ServerEvent;

/// Opaque handle for one live websocket connection.
pub type ConnectionId = Uuid;

/// A reachable connection: its id plus the channel its writer task drains.
#[derive(Debug, Clone)]
pub struct Peer {
    id: ConnectionId,
    tx: UnboundedSender<ServerEvent>,
}

impl Peer {
    pub fn new(id: ConnectionId, tx: UnboundedSender<ServerEvent>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Fire-and-forget. A closed channel means the peer is going away; the
    /// disconnect notification will clean up, so the error is dropped here.
    pub fn send(&self, event: ServerEvent) {
        let _ = self.tx.send(event);
    }
}

#[derive(Clone, Default)]
pub struct Presence {
    peers: Arc<Mutex<HashMap<String, Peer>>>,
}

impl Presence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under `username` and return the new snapshot.
    ///
    /// Last write wins: a second connection under the same username replaces
    /// the first, which stays open but is no longer addressable here. One
    /// connection per identity is a known limitation, not an accident.
    pub fn register(&self, username: &str, peer: Peer) -> Vec<String> {
        let mut peers = self.peers.lock();
        peers.insert(username.to_owned(), peer);
        Self::usernames(&peers)
    }

    /// Remove the entry holding this connection, if any, and return the
    /// snapshot. Disconnects arrive keyed by connection, not username, and a
    /// stale disconnect (the entry was already overwritten) is a no-op.
    pub fn unregister(&self, id: ConnectionId) -> Vec<String> {
        let mut peers = self.peers.lock();
        let username = peers
            .iter()
            .find(|(_, peer)| peer.id == id)
            .map(|(username, _)| username.clone());
        if let Some(username) = username {
            peers.remove(&username);
        }
        Self::usernames(&peers)
    }

    /// Absence is routine (the recipient may simply be offline), so this is
    /// an `Option`, not an error.
    pub fn lookup(&self, username: &str) -> Option<Peer> {
        self.peers.lock().get(username).cloned()
    }

    pub fn snapshot(&self) -> Vec<String> {
        Self::usernames(&self.peers.lock())
    }

    /// Send an event to every registered connection.
    pub fn broadcast(&self, event: &ServerEvent) {
        for peer in self.peers.lock().values() {
            peer.send(event.clone());
        }
    }

    fn usernames(peers: &HashMap<String, Peer>) -> Vec<String> {
        peers.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

    fn peer() -> (Peer, UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = unbounded_channel();
        (Peer::new(Uuid::now_v7(), tx), rx)
    }

    fn sorted(mut names: Vec<String>) -> Vec<String> {
        names.sort();
        names
    }

    #[test]
    fn register_is_idempotent() {
        let presence = Presence::new();
        let (alice, _rx) = peer();
        presence.register("alice", alice.clone());
        let snapshot = presence.register("alice", alice);
        assert_eq!(snapshot, vec!["alice".to_owned()]);
    }

    #[test]
    fn duplicate_registration_last_write_wins() {
        let presence = Presence::new();
        let (first, _rx1) = peer();
        let (second, _rx2) = peer();
        presence.register("alice", first.clone());
        presence.register("alice", second.clone());

        let found = presence.lookup("alice").map(|p| p.id());
        assert_eq!(found, Some(second.id()));

        // Unregistering the replaced connection must not evict the winner.
        let snapshot = presence.unregister(first.id());
        assert_eq!(snapshot, vec!["alice".to_owned()]);

        let snapshot = presence.unregister(second.id());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn unregister_unknown_connection_is_noop() {
        let presence = Presence::new();
        let (alice, _rx) = peer();
        presence.register("alice", alice);
        let snapshot = presence.unregister(Uuid::now_v7());
        assert_eq!(snapshot, vec!["alice".to_owned()]);
    }

    #[test]
    fn lookup_absent_user_is_none() {
        let presence = Presence::new();
        assert!(presence.lookup("nobody").is_none());
    }

    #[test]
    fn broadcast_reaches_every_registered_peer() {
        let presence = Presence::new();
        let (alice, mut alice_rx) = peer();
        let (bob, mut bob_rx) = peer();
        presence.register("alice", alice);
        presence.register("bob", bob);

        presence.broadcast(&ServerEvent::UserList { users: presence.snapshot() });

        for rx in [&mut alice_rx, &mut bob_rx] {
            match rx.try_recv() {
                Ok(ServerEvent::UserList { users }) => {
                    assert_eq!(sorted(users), vec!["alice".to_owned(), "bob".to_owned()]);
                }
                other => panic!("expected user list, got {other:?}"),
            }
        }
    }
}

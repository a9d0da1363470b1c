//! The Peer Registry: connected peers and their transport handles.
//!
//! Owned by the Host Loop thread. The ordering invariant lives here:
//! an entry is removed in the same synchronous step that pushes the
//! disconnect or timeout event, so the send phase of the same tick can
//! never address a gone peer.

use std::collections::HashMap;

use netforge_protocol::ClientId;
use netforge_transport::Peer;

pub(crate) struct PeerRegistry {
    peers: HashMap<ClientId, Peer>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self {
            peers: HashMap::new(),
        }
    }

    pub fn insert(&mut self, peer: Peer) -> ClientId {
        let id = ClientId(peer.id());
        self.peers.insert(id, peer);
        id
    }

    pub fn remove(&mut self, id: ClientId) -> Option<Peer> {
        self.peers.remove(&id)
    }

    /// Transport handle for a connected client; `None` for stale ids.
    pub fn get(&self, id: ClientId) -> Option<Peer> {
        self.peers.get(&id).copied()
    }

    pub fn handles(&self) -> impl Iterator<Item = Peer> + '_ {
        self.peers.values().copied()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }
}

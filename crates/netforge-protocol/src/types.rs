//! Core protocol value types.
//!
//! Everything here is a plain value: ids, the entity record, and the
//! reliability-tagged byte frame. None of it holds a transport resource,
//! which is what lets these types cross freely between the consumer
//! thread and the network loop.

use std::fmt;

use netforge_transport::Reliability;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A connection id assigned by the transport engine.
///
/// Newtype over `u32` so a connection id can never be confused with an
/// entity id, even though both are 32-bit on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u32);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// A server-allocated entity id.
///
/// Allocated from a strictly increasing counter; never reused within a
/// server's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A server-allocated entity: an id plus the connection that owns it.
///
/// Immutable once created. Client-side copies are a cache of the server's
/// creation broadcast, never authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entity {
    id: EntityId,
    owner: ClientId,
}

impl Entity {
    pub fn new(id: EntityId, owner: ClientId) -> Self {
        Self { id, owner }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The connection that created the entity and holds write access.
    pub fn owner(&self) -> ClientId {
        self.owner
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.owner)
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// A reliability class plus an opaque byte payload.
///
/// This is the unit the application hands to `send`/`broadcast`. Frames
/// are write-once: build the payload, queue the frame, never touch it
/// again. The messaging layer wraps the payload in a tagged wire format
/// (see [`crate::ToServer`] / [`crate::ToClient`]) before it hits the
/// transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub reliability: Reliability,
    pub payload: Vec<u8>,
}

impl Frame {
    /// An empty frame with the given reliability class.
    pub fn new(reliability: Reliability) -> Self {
        Self {
            reliability,
            payload: Vec::new(),
        }
    }

    /// A frame built from an existing payload.
    pub fn from_payload(reliability: Reliability, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            reliability,
            payload: payload.into(),
        }
    }

    /// Appends bytes to the payload. Only meaningful while building.
    pub fn append(&mut self, bytes: &[u8]) {
        self.payload.extend_from_slice(bytes);
    }
}

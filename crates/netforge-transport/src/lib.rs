//! Transport abstraction layer for Netforge.
//!
//! Provides the [`Host`] trait that abstracts over an unreliable-UDP
//! transport engine. The engine is a black box to the rest of the stack:
//! it establishes connections, delivers packets in three reliability
//! classes, reports peer lifecycle events, and samples round-trip time.
//!
//! The trait is deliberately blocking: one background thread per client
//! or server owns a `Host` exclusively and pumps it with
//! [`Host::service`]. Nothing above this crate ever touches a transport
//! handle from another thread.
//!
//! # Feature Flags
//!
//! - `memory` (default) — in-process loopback transport via
//!   [`MemoryNetwork`], used by the test suite and the console demo.

mod error;
#[cfg(feature = "memory")]
mod memory;

pub use error::TransportError;
#[cfg(feature = "memory")]
pub use memory::{MemoryHost, MemoryNetwork};

use std::fmt;
use std::time::Duration;

/// Delivery guarantee for a single packet.
///
/// The numeric values are fixed: they travel on the wire inside relay
/// frames, so they are part of the protocol, not an implementation
/// detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Reliability {
    /// May be lost, but arrives in order when it arrives.
    UnreliableOrdered = 0,

    /// Delivered, in order. The default for control traffic.
    #[default]
    Reliable = 1,

    /// May be lost, may arrive out of order.
    UnreliableUnordered = 2,
}

impl Reliability {
    /// Returns the wire byte for this reliability class.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parses a wire byte. Returns `None` for out-of-range values.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::UnreliableOrdered),
            1 => Some(Self::Reliable),
            2 => Some(Self::UnreliableUnordered),
            _ => None,
        }
    }
}

/// Opaque handle to a remote peer.
///
/// The transport engine assigns the 32-bit id. Handles are plain values:
/// copying one never copies any transport resource, which is what allows
/// ids to cross the thread boundary while the engine itself stays on the
/// loop thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Peer(u32);

impl Peer {
    /// Creates a handle from a raw transport-assigned id.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the transport-assigned id.
    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// An event surfaced by [`Host::service`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A connection completed (outgoing on clients, incoming on servers).
    Connect { peer: Peer },

    /// The peer disconnected cleanly.
    Disconnect { peer: Peer },

    /// The peer went silent past the engine's timeout.
    Timeout { peer: Peer },

    /// A packet arrived from the peer.
    Receive { peer: Peer, data: Vec<u8> },
}

/// A blocking transport engine endpoint.
///
/// Mirrors the classic service-loop shape: call [`service`](Self::service)
/// with a bounded wait to drain one event at a time, send with explicit
/// reliability flags, and [`flush`](Self::flush) before teardown.
pub trait Host: Send + 'static {
    /// Initiates an outgoing connection.
    ///
    /// Returns a provisional peer handle; the connection is established
    /// only once a [`HostEvent::Connect`] is observed, and the handle
    /// carried by that event supersedes this one.
    ///
    /// # Errors
    /// Returns `TransportError::ConnectFailed` if the target is not
    /// reachable at all (no listener, resolution failure).
    fn connect(&mut self, addr: &str, port: u16) -> Result<Peer, TransportError>;

    /// Waits up to `timeout` for the next event.
    ///
    /// Returns `Ok(None)` when the wait elapsed without an event.
    ///
    /// # Errors
    /// Returns an error only when the engine itself is broken; per-peer
    /// failures surface as events instead.
    fn service(&mut self, timeout: Duration) -> Result<Option<HostEvent>, TransportError>;

    /// Sends one packet to a single peer.
    ///
    /// # Errors
    /// Returns `TransportError::PeerNotFound` if the peer has already
    /// been torn down. Callers racing against disconnects are expected
    /// to treat this as a silent drop.
    fn send(
        &mut self,
        peer: Peer,
        data: &[u8],
        reliability: Reliability,
    ) -> Result<(), TransportError>;

    /// Sends one packet to every connected peer, optionally skipping one.
    fn broadcast_except(&mut self, except: Option<Peer>, data: &[u8], reliability: Reliability);

    /// Requests a graceful disconnect from the peer. No-op for unknown
    /// handles. Completion is reported via [`HostEvent::Disconnect`].
    fn disconnect(&mut self, peer: Peer);

    /// Last sampled round-trip time for the peer. Zero when unknown.
    fn round_trip_time(&self, peer: Peer) -> Duration;

    /// Remote address of the peer, if still connected.
    fn peer_addr(&self, peer: Peer) -> Option<String>;

    /// Pushes any internally buffered outgoing packets to the network.
    fn flush(&mut self);
}

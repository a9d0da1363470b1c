//! # Netforge
//!
//! Real-time client/server messaging over an unreliable-datagram
//! transport.
//!
//! Netforge layers a small binary protocol on a blocking transport
//! engine: clients exchange opaque payloads through a relay server,
//! with per-frame reliability classes, server-owned entities, and a
//! non-blocking `poll` API on both ends. One background thread per
//! [`Client`] or [`Server`] owns the transport; the application talks
//! to it only through queues.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netforge::prelude::*;
//!
//! let network = MemoryNetwork::new();
//! let server = Server::start(
//!     network.listen(4000, 32).expect("port free"),
//!     ServerConfig::default(),
//! );
//! let client = Client::connect(network.open(), "localhost", 4000, ClientConfig::default());
//! client.broadcast(Frame::from_payload(Reliability::Reliable, b"hello".as_slice()));
//! # drop(client);
//! # drop(server);
//! ```

mod error;

pub use error::NetforgeError;

pub use netforge_client::{Client, ClientConfig, ClientError, ClientHandler, ConnectionState};
pub use netforge_protocol::{
    ClientId, Entity, EntityId, Frame, ProtocolError, Reliability, ToClient, ToServer,
};
pub use netforge_server::{Server, ServerConfig, ServerHandler};
pub use netforge_transport::{Host, HostEvent, Peer, TransportError};

#[cfg(feature = "memory")]
pub use netforge_transport::{MemoryHost, MemoryNetwork};

/// Everything a typical application needs in one import.
pub mod prelude {
    pub use crate::{
        Client, ClientConfig, ClientError, ClientHandler, ClientId, ConnectionState, Entity,
        EntityId, Frame, NetforgeError, Reliability, Server, ServerConfig, ServerHandler,
    };

    #[cfg(feature = "memory")]
    pub use crate::{MemoryHost, MemoryNetwork};
}

//! Wire protocol for Netforge.
//!
//! This crate defines the "language" that clients and servers speak:
//!
//! - **Types** ([`Frame`], [`ClientId`], [`EntityId`], [`Entity`]) — the
//!   values that cross the thread boundary and the network.
//! - **Messages** ([`ToClient`], [`ToServer`]) — one tagged variant per
//!   wire format, each with a pure `encode` and a bounds-checked `decode`.
//! - **Errors** ([`ProtocolError`]) — every way a packet can be malformed.
//!
//! # Wire format
//!
//! Every packet is `[tag: u8][tag-specific fields][payload: rest]`.
//! Multi-byte integers are little-endian and fixed-width (u32 for ids).
//! Trailing byte strings carry no length prefix; their length is implied
//! by the enclosing packet.
//!
//! The codec is total over arbitrary input: decoding never reads past
//! the packet, never panics, and reports unknown tags as
//! [`ProtocolError::UnknownTag`] rather than skipping them — an unknown
//! tag means the stream is desynchronized and the peer must be told.

mod error;
mod types;
mod wire;

pub use error::ProtocolError;
pub use types::{ClientId, Entity, EntityId, Frame};
pub use wire::{ToClient, ToServer};

// Re-exported so protocol users name one reliability type.
pub use netforge_transport::Reliability;

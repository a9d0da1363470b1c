//! Tagged binary wire formats.
//!
//! Two direction-specific message enums, each with a pure
//! `encode -> Vec<u8>` and a bounds-checked `decode(&[u8])`. The tag is
//! always the first byte; the numeric assignments below are frozen.
//!
//! ```text
//! server → client                      client → server
//! 0 Connection    {client_id}          0 ServerMessage          {payload}
//! 1 ClientMessage {payload}            1 RelayEntityMessage     {rel, entity, payload}
//! 2 EntityMessage {entity, payload}    2 BroadcastEntityMessage {rel, entity, payload}
//! 3 Error         {message}            3 RelayClientMessage     {rel, payload}
//! 4 EntityCreated {entity, owner,      4 BroadcastClientMessage {rel, payload}
//!                  user_data}          5 CreateEntityRequest    {user_data}
//! 5 EntityChangedOwnership (reserved)  6 GiveEntityOwnershipRequest (reserved)
//! ```
//!
//! The `rel` byte inside relay/broadcast requests tells the server which
//! reliability class to use when it re-wraps and fans the message out;
//! it mirrors the reliability the client sent the request with.

use netforge_transport::Reliability;

use crate::{ClientId, EntityId, ProtocolError};

// Server → client tags.
const TC_CONNECTION: u8 = 0;
const TC_CLIENT_MESSAGE: u8 = 1;
const TC_ENTITY_MESSAGE: u8 = 2;
const TC_ERROR: u8 = 3;
const TC_ENTITY_CREATED: u8 = 4;
const TC_ENTITY_CHANGED_OWNERSHIP: u8 = 5;

// Client → server tags.
const TS_SERVER_MESSAGE: u8 = 0;
const TS_RELAY_ENTITY_MESSAGE: u8 = 1;
const TS_BROADCAST_ENTITY_MESSAGE: u8 = 2;
const TS_RELAY_CLIENT_MESSAGE: u8 = 3;
const TS_BROADCAST_CLIENT_MESSAGE: u8 = 4;
const TS_CREATE_ENTITY_REQUEST: u8 = 5;
const TS_GIVE_ENTITY_OWNERSHIP_REQUEST: u8 = 6;

// ---------------------------------------------------------------------------
// Bounds-checked reader
// ---------------------------------------------------------------------------

/// Cursor over a received packet. Every read is length-checked; a short
/// packet yields `ProtocolError::Truncated` naming the field that was
/// being read, never an out-of-range access.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn u8(&mut self, context: &'static str) -> Result<u8, ProtocolError> {
        let byte = *self
            .buf
            .get(self.pos)
            .ok_or(ProtocolError::Truncated { context })?;
        self.pos += 1;
        Ok(byte)
    }

    fn u32(&mut self, context: &'static str) -> Result<u32, ProtocolError> {
        let end = self
            .pos
            .checked_add(4)
            .filter(|end| *end <= self.buf.len())
            .ok_or(ProtocolError::Truncated { context })?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.buf[self.pos..end]);
        self.pos = end;
        Ok(u32::from_le_bytes(bytes))
    }

    fn reliability(&mut self) -> Result<Reliability, ProtocolError> {
        let byte = self.u8("reliability")?;
        Reliability::from_u8(byte).ok_or(ProtocolError::InvalidReliability(byte))
    }

    /// Consumes everything left in the packet.
    fn rest(self) -> Vec<u8> {
        self.buf[self.pos..].to_vec()
    }
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

// ---------------------------------------------------------------------------
// Server → client messages
// ---------------------------------------------------------------------------

/// A message travelling from the server to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToClient {
    /// "You are connected; this is your id." Sent once per connection,
    /// right after the transport-level accept — identity is assigned by
    /// the server, post-handshake.
    Connection { client_id: ClientId },

    /// An application payload relayed or broadcast from another client
    /// (or originated by server logic).
    ClientMessage { payload: Vec<u8> },

    /// An application payload addressed to an entity.
    EntityMessage {
        entity_id: EntityId,
        payload: Vec<u8>,
    },

    /// The server refused or failed to process something; human-readable.
    Error { message: String },

    /// A new entity exists. Broadcast to every client, owner included.
    EntityCreated {
        entity_id: EntityId,
        owner: ClientId,
        user_data: Vec<u8>,
    },

    /// Reserved tag; decoded but carries no behavior.
    EntityChangedOwnership,
}

impl ToClient {
    /// Serializes into wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Connection { client_id } => {
                let mut out = vec![TC_CONNECTION];
                put_u32(&mut out, client_id.0);
                out
            }
            Self::ClientMessage { payload } => {
                let mut out = vec![TC_CLIENT_MESSAGE];
                out.extend_from_slice(payload);
                out
            }
            Self::EntityMessage { entity_id, payload } => {
                let mut out = vec![TC_ENTITY_MESSAGE];
                put_u32(&mut out, entity_id.0);
                out.extend_from_slice(payload);
                out
            }
            Self::Error { message } => {
                let mut out = vec![TC_ERROR];
                out.extend_from_slice(message.as_bytes());
                out
            }
            Self::EntityCreated {
                entity_id,
                owner,
                user_data,
            } => {
                let mut out = vec![TC_ENTITY_CREATED];
                put_u32(&mut out, entity_id.0);
                put_u32(&mut out, owner.0);
                out.extend_from_slice(user_data);
                out
            }
            Self::EntityChangedOwnership => vec![TC_ENTITY_CHANGED_OWNERSHIP],
        }
    }

    /// Parses wire bytes.
    ///
    /// # Errors
    /// Any malformed input — unknown tag, short field — is a
    /// [`ProtocolError`]; no partial message is ever returned.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = Reader::new(bytes);
        let tag = reader.u8("tag")?;
        match tag {
            TC_CONNECTION => Ok(Self::Connection {
                client_id: ClientId(reader.u32("client id")?),
            }),
            TC_CLIENT_MESSAGE => Ok(Self::ClientMessage {
                payload: reader.rest(),
            }),
            TC_ENTITY_MESSAGE => {
                let entity_id = EntityId(reader.u32("entity id")?);
                Ok(Self::EntityMessage {
                    entity_id,
                    payload: reader.rest(),
                })
            }
            TC_ERROR => Ok(Self::Error {
                message: String::from_utf8_lossy(&reader.rest()).into_owned(),
            }),
            TC_ENTITY_CREATED => {
                let entity_id = EntityId(reader.u32("entity id")?);
                let owner = ClientId(reader.u32("owner id")?);
                Ok(Self::EntityCreated {
                    entity_id,
                    owner,
                    user_data: reader.rest(),
                })
            }
            TC_ENTITY_CHANGED_OWNERSHIP => Ok(Self::EntityChangedOwnership),
            tag => Err(ProtocolError::UnknownTag { tag }),
        }
    }
}

// ---------------------------------------------------------------------------
// Client → server messages
// ---------------------------------------------------------------------------

/// A message travelling from a client to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToServer {
    /// A payload addressed to the server's own application logic.
    ServerMessage { payload: Vec<u8> },

    /// Ask the server to fan an entity payload out to everyone except
    /// the sender.
    RelayEntityMessage {
        reliability: Reliability,
        entity_id: EntityId,
        payload: Vec<u8>,
    },

    /// Ask the server to fan an entity payload out to everyone,
    /// sender included.
    BroadcastEntityMessage {
        reliability: Reliability,
        entity_id: EntityId,
        payload: Vec<u8>,
    },

    /// Ask the server to fan a plain payload out to everyone except
    /// the sender.
    RelayClientMessage {
        reliability: Reliability,
        payload: Vec<u8>,
    },

    /// Ask the server to fan a plain payload out to everyone,
    /// sender included.
    BroadcastClientMessage {
        reliability: Reliability,
        payload: Vec<u8>,
    },

    /// Ask the server to allocate an entity owned by the sender.
    CreateEntityRequest { user_data: Vec<u8> },

    /// Reserved tag; decoded but carries no behavior.
    GiveEntityOwnershipRequest,
}

impl ToServer {
    /// Serializes into wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::ServerMessage { payload } => {
                let mut out = vec![TS_SERVER_MESSAGE];
                out.extend_from_slice(payload);
                out
            }
            Self::RelayEntityMessage {
                reliability,
                entity_id,
                payload,
            } => {
                let mut out = vec![TS_RELAY_ENTITY_MESSAGE, reliability.as_u8()];
                put_u32(&mut out, entity_id.0);
                out.extend_from_slice(payload);
                out
            }
            Self::BroadcastEntityMessage {
                reliability,
                entity_id,
                payload,
            } => {
                let mut out = vec![TS_BROADCAST_ENTITY_MESSAGE, reliability.as_u8()];
                put_u32(&mut out, entity_id.0);
                out.extend_from_slice(payload);
                out
            }
            Self::RelayClientMessage {
                reliability,
                payload,
            } => {
                let mut out = vec![TS_RELAY_CLIENT_MESSAGE, reliability.as_u8()];
                out.extend_from_slice(payload);
                out
            }
            Self::BroadcastClientMessage {
                reliability,
                payload,
            } => {
                let mut out = vec![TS_BROADCAST_CLIENT_MESSAGE, reliability.as_u8()];
                out.extend_from_slice(payload);
                out
            }
            Self::CreateEntityRequest { user_data } => {
                let mut out = vec![TS_CREATE_ENTITY_REQUEST];
                out.extend_from_slice(user_data);
                out
            }
            Self::GiveEntityOwnershipRequest => vec![TS_GIVE_ENTITY_OWNERSHIP_REQUEST],
        }
    }

    /// Parses wire bytes.
    ///
    /// # Errors
    /// Any malformed input — unknown tag, short field, out-of-range
    /// reliability byte — is a [`ProtocolError`].
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = Reader::new(bytes);
        let tag = reader.u8("tag")?;
        match tag {
            TS_SERVER_MESSAGE => Ok(Self::ServerMessage {
                payload: reader.rest(),
            }),
            TS_RELAY_ENTITY_MESSAGE => {
                let reliability = reader.reliability()?;
                let entity_id = EntityId(reader.u32("entity id")?);
                Ok(Self::RelayEntityMessage {
                    reliability,
                    entity_id,
                    payload: reader.rest(),
                })
            }
            TS_BROADCAST_ENTITY_MESSAGE => {
                let reliability = reader.reliability()?;
                let entity_id = EntityId(reader.u32("entity id")?);
                Ok(Self::BroadcastEntityMessage {
                    reliability,
                    entity_id,
                    payload: reader.rest(),
                })
            }
            TS_RELAY_CLIENT_MESSAGE => {
                let reliability = reader.reliability()?;
                Ok(Self::RelayClientMessage {
                    reliability,
                    payload: reader.rest(),
                })
            }
            TS_BROADCAST_CLIENT_MESSAGE => {
                let reliability = reader.reliability()?;
                Ok(Self::BroadcastClientMessage {
                    reliability,
                    payload: reader.rest(),
                })
            }
            TS_CREATE_ENTITY_REQUEST => Ok(Self::CreateEntityRequest {
                user_data: reader.rest(),
            }),
            TS_GIVE_ENTITY_OWNERSHIP_REQUEST => Ok(Self::GiveEntityOwnershipRequest),
            tag => Err(ProtocolError::UnknownTag { tag }),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

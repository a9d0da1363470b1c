//! The Router: decodes inbound frames and decides their fan-out.
//!
//! Runs on the Host Loop thread and owns the Entity Registry outright.
//! It never touches the transport; every outcome is an enqueue into an
//! outbound queue or the application receive queue.
//!
//! Entity relays are forwarded for any entity id, with no server-side
//! owner check. Ownership is enforced at the sending client; the server
//! stays a dumb pipe for entity traffic.
//!
//! `RelayClientMessage` deliberately gets full relay semantics, fanned
//! out to everyone except the sender, instead of being rejected as an
//! unsupported frame.

use crossbeam_channel::Sender;
use tracing::{debug, warn};

use netforge_protocol::{ClientId, Reliability, ToClient, ToServer};

use crate::entities::EntityRegistry;
use crate::queues::{Broadcast, Excluded, OutboundTx, Targeted};

/// Reply for any inbound packet the codec cannot make sense of.
const UNSUPPORTED_FRAME: &str = "Frame format not supported";

pub(crate) struct Router {
    entities: EntityRegistry,
    outbound: OutboundTx,
    receive_tx: Sender<(ClientId, Vec<u8>)>,
}

impl Router {
    pub fn new(outbound: OutboundTx, receive_tx: Sender<(ClientId, Vec<u8>)>) -> Self {
        Self {
            entities: EntityRegistry::new(),
            outbound,
            receive_tx,
        }
    }

    /// Routes one inbound packet. Malformed input costs the sender an
    /// `Error` frame and nothing else; the loop keeps servicing.
    pub fn route(&mut self, from: ClientId, data: &[u8]) {
        let message = match ToServer::decode(data) {
            Ok(message) => message,
            Err(error) => {
                warn!(%from, %error, "undecodable packet");
                self.error_to(from, UNSUPPORTED_FRAME);
                return;
            }
        };
        match message {
            ToServer::ServerMessage { payload } => {
                let _ = self.receive_tx.send((from, payload));
            }
            ToServer::CreateEntityRequest { user_data } => self.create_entity(from, user_data),
            ToServer::BroadcastClientMessage {
                reliability,
                payload,
            } => self.broadcast(ToClient::ClientMessage { payload }, reliability),
            ToServer::RelayClientMessage {
                reliability,
                payload,
            } => self.relay(from, ToClient::ClientMessage { payload }, reliability),
            ToServer::BroadcastEntityMessage {
                reliability,
                entity_id,
                payload,
            } => self.broadcast(ToClient::EntityMessage { entity_id, payload }, reliability),
            ToServer::RelayEntityMessage {
                reliability,
                entity_id,
                payload,
            } => self.relay(from, ToClient::EntityMessage { entity_id, payload }, reliability),
            ToServer::GiveEntityOwnershipRequest => {
                debug!(%from, "ignoring reserved ownership-transfer frame");
            }
        }
    }

    /// Allocates an entity and announces it to everyone, owner included.
    fn create_entity(&mut self, owner: ClientId, user_data: Vec<u8>) {
        match self.entities.create(owner) {
            Some(entity) => {
                debug!(%entity, total = self.entities.len(), "entity created");
                self.broadcast(
                    ToClient::EntityCreated {
                        entity_id: entity.id(),
                        owner: entity.owner(),
                        user_data,
                    },
                    Reliability::Reliable,
                );
            }
            None => {
                warn!(%owner, "entity id space exhausted, refusing creation");
                self.error_to(owner, "Entity id space exhausted");
            }
        }
    }

    fn broadcast(&self, message: ToClient, reliability: Reliability) {
        let _ = self.outbound.broadcast.send(Broadcast {
            data: message.encode(),
            reliability,
        });
    }

    fn relay(&self, from: ClientId, message: ToClient, reliability: Reliability) {
        let _ = self.outbound.excluded.send(Excluded {
            excluded: from,
            data: message.encode(),
            reliability,
        });
    }

    fn error_to(&self, target: ClientId, message: &str) {
        let _ = self.outbound.targeted.send(Targeted {
            targets: vec![target],
            data: ToClient::Error {
                message: message.to_owned(),
            }
            .encode(),
            reliability: Reliability::Reliable,
        });
    }
}

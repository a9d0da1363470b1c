//! The Event Bridge: per-category queues from the loop thread to the
//! consumer, plus the handler table `poll` dispatches into.
//!
//! Each event category gets its own channel so that `poll` can drain
//! them in a fixed priority order: connection result, disconnect,
//! timeout, received data, errors, entity creations, entity messages.
//! Within a category, arrival order is preserved.

use crossbeam_channel::{Receiver, Sender, unbounded};
use netforge_protocol::{ClientId, Entity, EntityId};

use crate::ClientError;

/// Outcome of the connection attempt (or a later identity update: the
/// server re-announces the session id in its `Connection` frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionResult {
    Connected { client_id: ClientId },
    Failed,
}

/// Caller-supplied callback table invoked by [`Client::poll`].
///
/// Every method has a no-op default, so implementors override only what
/// they care about. All callbacks run on the thread that called `poll`,
/// never on the session loop thread.
///
/// [`Client::poll`]: crate::Client::poll
#[allow(unused_variables)]
pub trait ClientHandler {
    /// The session is established and the server assigned this id.
    /// May fire a second time if the server re-announces identity.
    fn on_connect(&mut self, client_id: ClientId) {}

    /// The connection attempt failed (handshake timeout or rejection).
    fn on_connect_failed(&mut self) {}

    /// The session ended cleanly.
    fn on_disconnect(&mut self) {}

    /// The session ended because the server went silent.
    fn on_timeout(&mut self) {}

    /// A plain payload arrived (relayed or broadcast by the server).
    fn on_message(&mut self, payload: Vec<u8>) {}

    /// A contained error: ownership violation, malformed packet, or an
    /// `Error` frame from the server.
    fn on_error(&mut self, error: ClientError) {}

    /// The server announced a new entity. The entity is a cached copy;
    /// the server remains authoritative.
    fn on_entity_created(&mut self, entity: Entity, user_data: Vec<u8>) {}

    /// A payload addressed to an entity arrived.
    fn on_entity_message(&mut self, entity_id: EntityId, payload: Vec<u8>) {}
}

/// Producer half of the bridge, owned by the session loop.
#[derive(Clone)]
pub(crate) struct BridgeTx {
    pub connection: Sender<ConnectionResult>,
    pub disconnect: Sender<()>,
    pub timeout: Sender<()>,
    pub data: Sender<Vec<u8>>,
    pub error: Sender<ClientError>,
    pub entity_created: Sender<(Entity, Vec<u8>)>,
    pub entity_message: Sender<(EntityId, Vec<u8>)>,
}

/// Consumer half of the bridge, owned by the [`Client`](crate::Client).
pub(crate) struct BridgeRx {
    connection: Receiver<ConnectionResult>,
    disconnect: Receiver<()>,
    timeout: Receiver<()>,
    data: Receiver<Vec<u8>>,
    error: Receiver<ClientError>,
    entity_created: Receiver<(Entity, Vec<u8>)>,
    entity_message: Receiver<(EntityId, Vec<u8>)>,
}

pub(crate) fn bridge() -> (BridgeTx, BridgeRx) {
    let (connection_tx, connection_rx) = unbounded();
    let (disconnect_tx, disconnect_rx) = unbounded();
    let (timeout_tx, timeout_rx) = unbounded();
    let (data_tx, data_rx) = unbounded();
    let (error_tx, error_rx) = unbounded();
    let (entity_created_tx, entity_created_rx) = unbounded();
    let (entity_message_tx, entity_message_rx) = unbounded();
    (
        BridgeTx {
            connection: connection_tx,
            disconnect: disconnect_tx,
            timeout: timeout_tx,
            data: data_tx,
            error: error_tx,
            entity_created: entity_created_tx,
            entity_message: entity_message_tx,
        },
        BridgeRx {
            connection: connection_rx,
            disconnect: disconnect_rx,
            timeout: timeout_rx,
            data: data_rx,
            error: error_rx,
            entity_created: entity_created_rx,
            entity_message: entity_message_rx,
        },
    )
}

impl BridgeRx {
    /// Drains every category in the fixed priority order, invoking the
    /// handler per item. Cheap when everything is empty: seven failed
    /// `try_recv` calls and out.
    pub fn drain(&self, handler: &mut impl ClientHandler) {
        while let Ok(result) = self.connection.try_recv() {
            match result {
                ConnectionResult::Connected { client_id } => handler.on_connect(client_id),
                ConnectionResult::Failed => handler.on_connect_failed(),
            }
        }
        while self.disconnect.try_recv().is_ok() {
            handler.on_disconnect();
        }
        while self.timeout.try_recv().is_ok() {
            handler.on_timeout();
        }
        while let Ok(payload) = self.data.try_recv() {
            handler.on_message(payload);
        }
        while let Ok(error) = self.error.try_recv() {
            handler.on_error(error);
        }
        while let Ok((entity, user_data)) = self.entity_created.try_recv() {
            handler.on_entity_created(entity, user_data);
        }
        while let Ok((entity_id, payload)) = self.entity_message.try_recv() {
            handler.on_entity_message(entity_id, payload);
        }
    }
}

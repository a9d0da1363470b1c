//! The consumer-facing client handle.
//!
//! Every method here is non-blocking: sends enqueue a frame for the
//! session loop to flush on its next tick, and [`Client::poll`] drains
//! already-queued events. The only potentially blocking call is the
//! final join when the handle is dropped.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Sender, unbounded};
use tracing::debug;

use netforge_protocol::{ClientId, Entity, Frame, Reliability, ToServer};
use netforge_transport::Host;

use crate::ClientError;
use crate::config::ClientConfig;
use crate::events::{BridgeRx, ClientHandler, bridge};
use crate::session::{Control, SessionLoop};
use crate::state::{ConnectionState, SharedState};

/// One logical session against a server.
///
/// Created with [`Client::connect`], which spawns the session loop
/// thread and returns immediately; the connection outcome arrives
/// through [`ClientHandler::on_connect`] / `on_connect_failed` on a
/// later [`poll`](Client::poll).
pub struct Client {
    shared: Arc<SharedState>,
    bridge: BridgeRx,
    error_tx: Sender<ClientError>,
    outbound_tx: Sender<Frame>,
    control_tx: Sender<Control>,
    thread: Option<JoinHandle<()>>,
}

impl Client {
    /// Starts a session over the given transport host.
    ///
    /// Takes ownership of the host; it lives on the loop thread and is
    /// never touched from anywhere else.
    pub fn connect<H: Host>(host: H, addr: &str, port: u16, config: ClientConfig) -> Self {
        let shared = Arc::new(SharedState::new());
        let (bridge_tx, bridge_rx) = bridge();
        let (outbound_tx, outbound_rx) = unbounded();
        let (control_tx, control_rx) = unbounded();

        let error_tx = bridge_tx.error.clone();
        let loop_shared = Arc::clone(&shared);
        let addr = addr.to_owned();
        let thread = thread::Builder::new()
            .name("netforge-client".into())
            .spawn(move || {
                SessionLoop::new(host, config, loop_shared, bridge_tx, outbound_rx, control_rx)
                    .run(&addr, port);
            })
            .ok();
        if thread.is_none() {
            shared.set_state(ConnectionState::Disconnected);
        }

        Self {
            shared,
            bridge: bridge_rx,
            error_tx,
            outbound_tx,
            control_tx,
            thread,
        }
    }

    /// Drains all pending events, invoking the handler for each, and
    /// returns without waiting. Categories drain in a fixed priority
    /// order; arrival order is preserved within a category.
    pub fn poll(&mut self, handler: &mut impl ClientHandler) {
        self.bridge.drain(handler);
    }

    /// Sends a frame to every other client (sender excluded).
    pub fn send(&self, frame: Frame) {
        self.enqueue(
            frame.reliability,
            &ToServer::RelayClientMessage {
                reliability: frame.reliability,
                payload: frame.payload,
            },
        );
    }

    /// Sends a frame to every client, self included.
    pub fn broadcast(&self, frame: Frame) {
        self.enqueue(
            frame.reliability,
            &ToServer::BroadcastClientMessage {
                reliability: frame.reliability,
                payload: frame.payload,
            },
        );
    }

    /// Sends a frame to the server's own application logic; it is not
    /// forwarded to any client.
    pub fn send_server(&self, frame: Frame) {
        self.enqueue(
            frame.reliability,
            &ToServer::ServerMessage {
                payload: frame.payload,
            },
        );
    }

    /// Sends an entity frame to every other client.
    ///
    /// Only the entity's owner may send for it. A violation surfaces as
    /// exactly one [`ClientError::Ownership`] on the next poll and
    /// nothing reaches the wire.
    pub fn send_entity(&self, entity: &Entity, frame: Frame) {
        if !self.owns(entity) {
            return;
        }
        self.enqueue(
            frame.reliability,
            &ToServer::RelayEntityMessage {
                reliability: frame.reliability,
                entity_id: entity.id(),
                payload: frame.payload,
            },
        );
    }

    /// Sends an entity frame to every client, self included. Same
    /// ownership rule as [`send_entity`](Client::send_entity).
    pub fn broadcast_entity(&self, entity: &Entity, frame: Frame) {
        if !self.owns(entity) {
            return;
        }
        self.enqueue(
            frame.reliability,
            &ToServer::BroadcastEntityMessage {
                reliability: frame.reliability,
                entity_id: entity.id(),
                payload: frame.payload,
            },
        );
    }

    /// Asks the server to allocate an entity owned by this connection.
    /// The result arrives as an `on_entity_created` callback, broadcast
    /// to every client including this one.
    pub fn create_entity(&self, user_data: &[u8]) {
        self.enqueue(
            Reliability::Reliable,
            &ToServer::CreateEntityRequest {
                user_data: user_data.to_vec(),
            },
        );
    }

    /// Requests a clean disconnect. Non-blocking; the session reaches
    /// [`ConnectionState::Disconnected`] once the transport confirms.
    pub fn disconnect(&self) {
        let _ = self.control_tx.send(Control::Disconnect);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// The id the server assigned this connection, once known.
    pub fn client_id(&self) -> Option<ClientId> {
        self.shared.client_id()
    }

    /// Last sampled round-trip time to the server.
    pub fn ping(&self) -> Duration {
        self.shared.rtt()
    }

    /// Whether the session loop is still alive (not in a terminal state).
    pub fn is_running(&self) -> bool {
        !self.shared.state().is_terminal()
    }

    fn owns(&self, entity: &Entity) -> bool {
        if self.shared.client_id() == Some(entity.owner()) {
            return true;
        }
        debug!(%entity, "rejecting send for entity we do not own");
        let _ = self.error_tx.send(ClientError::Ownership {
            entity: entity.id(),
            owner: entity.owner(),
        });
        false
    }

    fn enqueue(&self, reliability: Reliability, message: &ToServer) {
        let _ = self
            .outbound_tx
            .send(Frame::from_payload(reliability, message.encode()));
    }
}

impl Drop for Client {
    /// Dropping the handle requests a disconnect and waits for the loop
    /// thread to flush and exit.
    fn drop(&mut self) {
        let _ = self.control_tx.send(Control::Disconnect);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

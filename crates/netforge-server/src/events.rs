//! The server-side Event Bridge and the handler table `poll` drains into.
//!
//! Four categories, drained in fixed priority order: connects first,
//! then received payloads, then disconnects, then timeouts. Within a
//! category, arrival order is preserved — so a burst of messages from a
//! peer that then disconnects is always delivered before its
//! disconnect event.

use crossbeam_channel::{Receiver, Sender, unbounded};
use netforge_protocol::ClientId;

/// Caller-supplied callback table invoked by [`Server::poll`].
///
/// Defaults are no-ops; all callbacks run on the thread that called
/// `poll`, never on the Host Loop thread.
///
/// [`Server::poll`]: crate::Server::poll
#[allow(unused_variables)]
pub trait ServerHandler {
    /// A peer completed the transport handshake and was assigned an id.
    /// `addr` is the remote address when the transport knows it.
    fn on_connect(&mut self, client: ClientId, addr: Option<String>) {}

    /// A payload addressed to server logic arrived from a client.
    fn on_receive(&mut self, from: ClientId, payload: Vec<u8>) {}

    /// A peer disconnected cleanly. Its id is already stale.
    fn on_disconnect(&mut self, client: ClientId) {}

    /// A peer went silent past the transport timeout. Id already stale.
    fn on_timeout(&mut self, client: ClientId) {}
}

#[derive(Clone)]
pub(crate) struct BridgeTx {
    pub connect: Sender<(ClientId, Option<String>)>,
    pub receive: Sender<(ClientId, Vec<u8>)>,
    pub disconnect: Sender<ClientId>,
    pub timeout: Sender<ClientId>,
}

pub(crate) struct BridgeRx {
    connect: Receiver<(ClientId, Option<String>)>,
    receive: Receiver<(ClientId, Vec<u8>)>,
    disconnect: Receiver<ClientId>,
    timeout: Receiver<ClientId>,
}

pub(crate) fn bridge() -> (BridgeTx, BridgeRx) {
    let (connect_tx, connect_rx) = unbounded();
    let (receive_tx, receive_rx) = unbounded();
    let (disconnect_tx, disconnect_rx) = unbounded();
    let (timeout_tx, timeout_rx) = unbounded();
    (
        BridgeTx {
            connect: connect_tx,
            receive: receive_tx,
            disconnect: disconnect_tx,
            timeout: timeout_tx,
        },
        BridgeRx {
            connect: connect_rx,
            receive: receive_rx,
            disconnect: disconnect_rx,
            timeout: timeout_rx,
        },
    )
}

impl BridgeRx {
    pub fn drain(&self, handler: &mut impl ServerHandler) {
        while let Ok((client, addr)) = self.connect.try_recv() {
            handler.on_connect(client, addr);
        }
        while let Ok((from, payload)) = self.receive.try_recv() {
            handler.on_receive(from, payload);
        }
        while let Ok(client) = self.disconnect.try_recv() {
            handler.on_disconnect(client);
        }
        while let Ok(client) = self.timeout.try_recv() {
            handler.on_timeout(client);
        }
    }
}

//! The consumer-facing server handle.
//!
//! Every method is non-blocking: sends enqueue wire bytes for the Host
//! Loop's next flush, [`Server::poll`] drains already-decoded events,
//! and [`Server::stop`] is an advisory flag. Frames queued after the
//! loop has stopped are accepted and silently never delivered, keeping
//! the API exception-free.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, unbounded};

use netforge_protocol::{ClientId, Frame, ToClient};
use netforge_transport::Host;

use crate::config::ServerConfig;
use crate::events::{BridgeRx, ServerHandler, bridge};
use crate::host_loop::{Control, HostLoop};
use crate::queues::{Broadcast, Excluded, OutboundTx, Targeted, outbound};

/// One running server instance.
///
/// Created with [`Server::start`] over an already-listening transport
/// host; the host lives on the Host Loop thread from then on.
pub struct Server {
    bridge: BridgeRx,
    outbound: OutboundTx,
    control_tx: Sender<Control>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Server {
    /// Spawns the Host Loop over the given transport host and returns
    /// immediately. Peers connect from the next tick on.
    pub fn start<H: Host>(host: H, config: ServerConfig) -> Self {
        let (bridge_tx, bridge_rx) = bridge();
        let (outbound_tx, outbound_rx) = outbound();
        let (control_tx, control_rx) = unbounded();
        let running = Arc::new(AtomicBool::new(true));

        let loop_outbound = outbound_tx.clone();
        let loop_running = Arc::clone(&running);
        let thread = thread::Builder::new()
            .name("netforge-server".into())
            .spawn(move || {
                HostLoop::new(
                    host,
                    config,
                    bridge_tx,
                    loop_outbound,
                    outbound_rx,
                    control_rx,
                    loop_running,
                )
                .run();
            })
            .ok();
        if thread.is_none() {
            running.store(false, Ordering::Release);
        }

        Self {
            bridge: bridge_rx,
            outbound: outbound_tx,
            control_tx,
            running,
            thread,
        }
    }

    /// Drains all pending events, invoking the handler for each, and
    /// returns without waiting. Connects drain first, then received
    /// payloads, then disconnects, then timeouts.
    pub fn poll(&mut self, handler: &mut impl ServerHandler) {
        self.bridge.drain(handler);
    }

    /// Sends a frame to every connected client.
    pub fn broadcast(&self, frame: Frame) {
        let _ = self.outbound.broadcast.send(Broadcast {
            data: wrap(frame.payload),
            reliability: frame.reliability,
        });
    }

    /// Sends a frame to every connected client except one. If the
    /// excluded id has already disconnected, everyone receives it.
    pub fn send_except(&self, excluded: ClientId, frame: Frame) {
        let _ = self.outbound.excluded.send(Excluded {
            excluded,
            data: wrap(frame.payload),
            reliability: frame.reliability,
        });
    }

    /// Sends a frame to an explicit list of clients. Ids that have
    /// disconnected by flush time are skipped silently; a stale id is
    /// an expected race, not an error.
    pub fn send_to(&self, targets: &[ClientId], frame: Frame) {
        let _ = self.outbound.targeted.send(Targeted {
            targets: targets.to_vec(),
            data: wrap(frame.payload),
            reliability: frame.reliability,
        });
    }

    /// Requests shutdown: one final flush, then a graceful disconnect
    /// of every peer. Idempotent and non-blocking; observe completion
    /// through [`is_running`](Server::is_running).
    pub fn stop(&self) {
        let _ = self.control_tx.send(Control::Stop);
    }

    /// Whether the Host Loop is still servicing the transport.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Server-originated payloads reach clients as plain `ClientMessage`
/// frames, indistinguishable from a relayed client payload.
fn wrap(payload: Vec<u8>) -> Vec<u8> {
    ToClient::ClientMessage { payload }.encode()
}

impl Drop for Server {
    /// Dropping the handle stops the loop and waits for its final flush.
    fn drop(&mut self) {
        let _ = self.control_tx.send(Control::Stop);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

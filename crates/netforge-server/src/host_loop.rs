//! The Host Loop: the background thread that owns the listening host.
//!
//! Tick shape: honor a pending stop, drain transport events (peers
//! register and deregister here, inbound frames go through the Router),
//! then flush the outbound queues broadcast-first. Peer removal happens
//! in the same synchronous step as the disconnect or timeout event, so
//! the send phase of a tick can never address a peer that left in it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, TryRecvError};
use tracing::{debug, info, warn};

use netforge_protocol::{ClientId, Reliability, ToClient};
use netforge_transport::{Host, HostEvent, Peer};

use crate::config::ServerConfig;
use crate::events::BridgeTx;
use crate::peers::PeerRegistry;
use crate::queues::{OutboundRx, OutboundTx, Targeted};
use crate::router::Router;

/// Commands from the consumer to the loop thread. A closed control
/// channel means the [`Server`](crate::Server) was dropped, which the
/// loop treats as a stop request.
pub(crate) enum Control {
    Stop,
}

pub(crate) struct HostLoop<H: Host> {
    host: H,
    config: ServerConfig,
    bridge: BridgeTx,
    router: Router,
    peers: PeerRegistry,
    outbound_tx: OutboundTx,
    outbound_rx: OutboundRx,
    control_rx: Receiver<Control>,
    running: Arc<AtomicBool>,
}

impl<H: Host> HostLoop<H> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        host: H,
        config: ServerConfig,
        bridge: BridgeTx,
        outbound_tx: OutboundTx,
        outbound_rx: OutboundRx,
        control_rx: Receiver<Control>,
        running: Arc<AtomicBool>,
    ) -> Self {
        let router = Router::new(outbound_tx.clone(), bridge.receive.clone());
        Self {
            host,
            config,
            bridge,
            router,
            peers: PeerRegistry::new(),
            outbound_tx,
            outbound_rx,
            control_rx,
            running,
        }
    }

    pub fn run(mut self) {
        info!("host loop started");
        loop {
            if self.stop_requested() {
                break;
            }
            if !self.drain_transport() {
                break;
            }
            self.flush_sends();
        }
        self.shutdown();
    }

    fn stop_requested(&self) -> bool {
        match self.control_rx.try_recv() {
            Ok(Control::Stop) => true,
            Err(TryRecvError::Disconnected) => true,
            Err(TryRecvError::Empty) => false,
        }
    }

    /// One bounded service call, then drain whatever is already queued.
    /// Returns `false` when the transport itself failed.
    fn drain_transport(&mut self) -> bool {
        let mut wait = self.config.tick;
        loop {
            match self.host.service(wait) {
                Ok(Some(event)) => {
                    self.handle_event(event);
                    wait = Duration::ZERO;
                }
                Ok(None) => return true,
                Err(error) => {
                    warn!(%error, "transport failure, stopping host loop");
                    return false;
                }
            }
        }
    }

    fn handle_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::Connect { peer } => {
                let client = self.peers.insert(peer);
                info!(%client, connected = self.peers.len(), "peer connected");
                let addr = self.host.peer_addr(peer);
                let _ = self.bridge.connect.send((client, addr));
                // Identity is assigned here, post-handshake; the new
                // peer learns its id from this frame.
                let _ = self.outbound_tx.targeted.send(Targeted {
                    targets: vec![client],
                    data: ToClient::Connection { client_id: client }.encode(),
                    reliability: Reliability::Reliable,
                });
            }
            HostEvent::Disconnect { peer } => {
                let client = ClientId(peer.id());
                if self.peers.remove(client).is_some() {
                    info!(%client, connected = self.peers.len(), "peer disconnected");
                    let _ = self.bridge.disconnect.send(client);
                }
            }
            HostEvent::Timeout { peer } => {
                let client = ClientId(peer.id());
                if self.peers.remove(client).is_some() {
                    warn!(%client, connected = self.peers.len(), "peer timed out");
                    let _ = self.bridge.timeout.send(client);
                }
            }
            HostEvent::Receive { peer, data } => {
                self.router.route(ClientId(peer.id()), &data);
            }
        }
    }

    /// Empties the outbound queues: broadcast, then excluded, then
    /// targeted, FIFO within each. Stale ids are resolved here, against
    /// the registry as it stands after this tick's removals.
    fn flush_sends(&mut self) {
        while let Ok(item) = self.outbound_rx.broadcast.try_recv() {
            self.host
                .broadcast_except(None, &item.data, item.reliability);
        }
        while let Ok(item) = self.outbound_rx.excluded.try_recv() {
            // A gone excluded peer degrades to a plain broadcast; the
            // exclusion no longer names anyone who could receive it.
            let excluded = self.peers.get(item.excluded);
            self.host
                .broadcast_except(excluded, &item.data, item.reliability);
        }
        while let Ok(item) = self.outbound_rx.targeted.try_recv() {
            for target in &item.targets {
                let Some(peer) = self.peers.get(*target) else {
                    debug!(%target, "dropping send to stale id");
                    continue;
                };
                if let Err(error) = self.host.send(peer, &item.data, item.reliability) {
                    debug!(%target, %error, "targeted send failed");
                }
            }
        }
    }

    /// Final flush of queued sends, then a graceful goodbye to every
    /// peer still connected.
    fn shutdown(&mut self) {
        info!(connected = self.peers.len(), "host loop stopping");
        self.flush_sends();
        let handles: Vec<Peer> = self.peers.handles().collect();
        for peer in handles {
            self.host.disconnect(peer);
        }
        self.host.flush();
        self.running.store(false, Ordering::Release);
    }
}

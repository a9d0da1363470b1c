//! The Session Loop: the background thread that owns the transport host.
//!
//! Nothing else ever touches the host. The loop performs the bounded
//! handshake, then ticks: drain transport events into the bridge, sample
//! round-trip time, honor a pending disconnect request, flush queued
//! outbound frames in FIFO order. It exits when the state machine
//! reaches a terminal state, flushing the host on the way out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};
use tracing::{debug, info, warn};

use netforge_protocol::{ClientId, Entity, Frame, ToClient};
use netforge_transport::{Host, HostEvent, Peer};

use crate::ClientError;
use crate::config::ClientConfig;
use crate::events::{BridgeTx, ConnectionResult};
use crate::state::{ConnectionState, SharedState};

/// Commands from the consumer to the loop thread.
///
/// A closed control channel means the [`Client`](crate::Client) was
/// dropped, which the loop treats the same as a disconnect request.
pub(crate) enum Control {
    Disconnect,
}

pub(crate) struct SessionLoop<H: Host> {
    host: H,
    config: ClientConfig,
    shared: Arc<SharedState>,
    bridge: BridgeTx,
    outbound_rx: Receiver<Frame>,
    control_rx: Receiver<Control>,
}

impl<H: Host> SessionLoop<H> {
    pub fn new(
        host: H,
        config: ClientConfig,
        shared: Arc<SharedState>,
        bridge: BridgeTx,
        outbound_rx: Receiver<Frame>,
        control_rx: Receiver<Control>,
    ) -> Self {
        Self {
            host,
            config,
            shared,
            bridge,
            outbound_rx,
            control_rx,
        }
    }

    /// Runs the session to completion. Consumes the loop; the host is
    /// flushed and dropped before this returns.
    pub fn run(mut self, addr: &str, port: u16) {
        match self.handshake(addr, port) {
            Some(peer) => {
                info!(%peer, "session established");
                self.run_connected(peer);
            }
            None => {
                warn!(addr, port, "connection failed");
                self.shared.set_state(ConnectionState::Disconnected);
                let _ = self.bridge.connection.send(ConnectionResult::Failed);
            }
        }
        self.host.flush();
    }

    /// Transport-level connect with a bounded wait for the accept.
    fn handshake(&mut self, addr: &str, port: u16) -> Option<Peer> {
        if let Err(error) = self.host.connect(addr, port) {
            debug!(%error, "transport connect refused");
            return None;
        }
        let deadline = Instant::now() + self.config.connect_timeout;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            match self.host.service(remaining) {
                Ok(Some(HostEvent::Connect { peer })) => {
                    self.shared.set_state(ConnectionState::Connected);
                    // Provisional identity from the transport handle; the
                    // server's Connection frame confirms or replaces it.
                    self.shared.set_client_id(ClientId(peer.id()));
                    let _ = self.bridge.connection.send(ConnectionResult::Connected {
                        client_id: ClientId(peer.id()),
                    });
                    return Some(peer);
                }
                Ok(Some(HostEvent::Disconnect { .. } | HostEvent::Timeout { .. })) => {
                    debug!("rejected during handshake");
                    return None;
                }
                Ok(Some(event)) => debug!(?event, "event before accept, dropped"),
                Ok(None) => {}
                Err(error) => {
                    debug!(%error, "transport error during handshake");
                    return None;
                }
            }
        }
    }

    fn run_connected(&mut self, peer: Peer) {
        while !self.shared.state().is_terminal() {
            self.drain_transport(peer);
            if self.shared.state().is_terminal() {
                break;
            }
            self.shared.set_rtt(self.host.round_trip_time(peer));
            self.check_control(peer);
            self.flush_outbound(peer);
        }
        debug!(state = ?self.shared.state(), "session loop exiting");
    }

    /// One bounded service call, then drain whatever else is already
    /// queued without waiting again.
    fn drain_transport(&mut self, peer: Peer) {
        let mut wait = self.config.tick;
        loop {
            match self.host.service(wait) {
                Ok(Some(event)) => {
                    self.handle_event(peer, event);
                    wait = Duration::ZERO;
                }
                Ok(None) => break,
                Err(error) => {
                    warn!(%error, "transport failure, closing session");
                    self.shared.set_state(ConnectionState::Disconnected);
                    let _ = self.bridge.disconnect.send(());
                    break;
                }
            }
        }
    }

    fn handle_event(&mut self, peer: Peer, event: HostEvent) {
        match event {
            HostEvent::Connect { peer: other } => {
                debug!(%other, "unexpected connect event while connected");
            }
            HostEvent::Disconnect { .. } => {
                info!(%peer, "disconnected by transport");
                self.shared.set_state(ConnectionState::Disconnected);
                let _ = self.bridge.disconnect.send(());
            }
            HostEvent::Timeout { .. } => {
                warn!(%peer, "connection timed out");
                self.shared.set_state(ConnectionState::TimedOut);
                let _ = self.bridge.timeout.send(());
            }
            HostEvent::Receive { data, .. } => self.handle_frame(&data),
        }
    }

    /// Decodes one inbound packet and routes it to its bridge category.
    /// A malformed packet costs one error event, nothing more.
    fn handle_frame(&mut self, data: &[u8]) {
        match ToClient::decode(data) {
            Ok(ToClient::Connection { client_id }) => {
                debug!(%client_id, "identity assigned by server");
                self.shared.set_client_id(client_id);
                let _ = self
                    .bridge
                    .connection
                    .send(ConnectionResult::Connected { client_id });
            }
            Ok(ToClient::ClientMessage { payload }) => {
                let _ = self.bridge.data.send(payload);
            }
            Ok(ToClient::EntityMessage { entity_id, payload }) => {
                let _ = self.bridge.entity_message.send((entity_id, payload));
            }
            Ok(ToClient::Error { message }) => {
                warn!(message, "error frame from server");
                let _ = self.bridge.error.send(ClientError::Server(message));
            }
            Ok(ToClient::EntityCreated {
                entity_id,
                owner,
                user_data,
            }) => {
                let entity = Entity::new(entity_id, owner);
                debug!(%entity, "entity created");
                let _ = self.bridge.entity_created.send((entity, user_data));
            }
            Ok(ToClient::EntityChangedOwnership) => {
                debug!("ignoring reserved ownership-change frame");
            }
            Err(error) => {
                warn!(%error, "undecodable packet from server");
                let _ = self.bridge.error.send(ClientError::Protocol(error));
            }
        }
    }

    /// Honors a disconnect request, whether explicit or implied by the
    /// consumer handle being dropped.
    fn check_control(&mut self, peer: Peer) {
        let requested = match self.control_rx.try_recv() {
            Ok(Control::Disconnect) => true,
            Err(TryRecvError::Disconnected) => true,
            Err(TryRecvError::Empty) => false,
        };
        if requested && self.shared.state() == ConnectionState::Connected {
            info!(%peer, "disconnect requested");
            self.host.disconnect(peer);
            self.shared.set_state(ConnectionState::Disconnecting);
        }
    }

    /// Sends everything queued this tick, strictly in FIFO order. Keeps
    /// flushing through `Disconnecting` so a frame queued just before
    /// the disconnect request still reaches the wire.
    fn flush_outbound(&mut self, peer: Peer) {
        if self.shared.state().is_terminal() {
            return;
        }
        while let Ok(frame) = self.outbound_rx.try_recv() {
            if let Err(error) = self.host.send(peer, &frame.payload, frame.reliability) {
                debug!(%error, "dropping outbound frame");
            }
        }
    }
}

//! In-process loopback transport.
//!
//! [`MemoryNetwork`] is a tiny hub that pairs hosts by port number, the
//! way a real engine pairs them by UDP address. Every host owns one
//! inbox channel; a "connection" is just the two endpoints holding each
//! other's inbox sender. Delivery is in-order and lossless regardless of
//! the requested reliability class, which is exactly what the test suite
//! and the console demo want.
//!
//! Timeouts are modeled as abrupt endpoint loss: when a host is dropped
//! without disconnecting, the next send to it fails and surfaces as a
//! [`HostEvent::Timeout`].

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use crate::{Host, HostEvent, Peer, Reliability, TransportError};

enum Packet {
    ConnectRequest {
        reply: Sender<Packet>,
        addr: String,
    },
    ConnectAccepted {
        assigned_id: u32,
        server_tx: Sender<Packet>,
        server_addr: String,
    },
    ConnectRejected,
    Data {
        from: u32,
        data: Vec<u8>,
    },
    Bye {
        from: u32,
    },
}

struct Link {
    tx: Sender<Packet>,
    addr: String,
}

struct NetworkInner {
    listeners: Mutex<HashMap<u16, Sender<Packet>>>,
    next_label: AtomicU64,
}

/// The shared hub that pairs in-process hosts.
///
/// Clone handles freely; all clones see the same "network". This is the
/// explicit, scoped stand-in for a transport library's global init state:
/// create one at process start, pass it to whoever opens hosts, drop it
/// at shutdown.
#[derive(Clone)]
pub struct MemoryNetwork {
    inner: Arc<NetworkInner>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(NetworkInner {
                listeners: Mutex::new(HashMap::new()),
                next_label: AtomicU64::new(1),
            }),
        }
    }

    /// Opens a listening host on `port`, accepting up to `max_clients`
    /// concurrent connections.
    ///
    /// # Errors
    /// Returns `TransportError::BindFailed` if the port is already taken.
    pub fn listen(&self, port: u16, max_clients: usize) -> Result<MemoryHost, TransportError> {
        let (tx, rx) = unbounded();
        let mut listeners = lock(&self.inner.listeners);
        if listeners.contains_key(&port) {
            return Err(TransportError::BindFailed(format!("port {port} in use")));
        }
        listeners.insert(port, tx.clone());
        tracing::debug!(port, max_clients, "memory transport listening");
        Ok(MemoryHost {
            network: self.clone(),
            inbox_tx: tx,
            inbox_rx: rx,
            links: HashMap::new(),
            pending: VecDeque::new(),
            next_id: 0,
            max_clients,
            listen_port: Some(port),
            local_addr: format!("mem://listener-{port}"),
            rtt: Duration::ZERO,
        })
    }

    /// Opens an unbound host for outgoing connections.
    pub fn open(&self) -> MemoryHost {
        let (tx, rx) = unbounded();
        let label = self.inner.next_label.fetch_add(1, Ordering::Relaxed);
        MemoryHost {
            network: self.clone(),
            inbox_tx: tx,
            inbox_rx: rx,
            links: HashMap::new(),
            pending: VecDeque::new(),
            next_id: 0,
            max_clients: 0,
            listen_port: None,
            local_addr: format!("mem://host-{label}"),
            rtt: Duration::ZERO,
        }
    }
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

/// One endpoint on a [`MemoryNetwork`].
pub struct MemoryHost {
    network: MemoryNetwork,
    inbox_tx: Sender<Packet>,
    inbox_rx: Receiver<Packet>,
    links: HashMap<u32, Link>,
    pending: VecDeque<HostEvent>,
    next_id: u32,
    max_clients: usize,
    listen_port: Option<u16>,
    local_addr: String,
    rtt: Duration,
}

impl MemoryHost {
    /// Fixes the value reported by [`Host::round_trip_time`].
    pub fn set_simulated_rtt(&mut self, rtt: Duration) {
        self.rtt = rtt;
    }

    fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::ConnectRequest { reply, addr } => {
                if self.listen_port.is_none() || self.links.len() >= self.max_clients {
                    let _ = reply.send(Packet::ConnectRejected);
                    tracing::debug!(%addr, "rejected connection");
                    return;
                }
                let id = self.next_id;
                self.next_id += 1;
                let _ = reply.send(Packet::ConnectAccepted {
                    assigned_id: id,
                    server_tx: self.inbox_tx.clone(),
                    server_addr: self.local_addr.clone(),
                });
                tracing::debug!(id, %addr, "accepted connection");
                self.links.insert(id, Link { tx: reply, addr });
                self.pending.push_back(HostEvent::Connect {
                    peer: Peer::new(id),
                });
            }
            Packet::ConnectAccepted {
                assigned_id,
                server_tx,
                server_addr,
            } => {
                self.links.insert(
                    assigned_id,
                    Link {
                        tx: server_tx,
                        addr: server_addr,
                    },
                );
                self.pending.push_back(HostEvent::Connect {
                    peer: Peer::new(assigned_id),
                });
            }
            Packet::ConnectRejected => {
                self.pending.push_back(HostEvent::Disconnect {
                    peer: Peer::new(0),
                });
            }
            Packet::Data { from, data } => {
                if self.links.contains_key(&from) {
                    self.pending.push_back(HostEvent::Receive {
                        peer: Peer::new(from),
                        data,
                    });
                }
                // Data from an already-removed link is dropped.
            }
            Packet::Bye { from } => {
                if self.links.remove(&from).is_some() {
                    self.pending.push_back(HostEvent::Disconnect {
                        peer: Peer::new(from),
                    });
                }
            }
        }
    }

    fn send_on_link(&mut self, id: u32, data: &[u8]) -> bool {
        let Some(link) = self.links.get(&id) else {
            return false;
        };
        if link
            .tx
            .send(Packet::Data {
                from: id,
                data: data.to_vec(),
            })
            .is_err()
        {
            // Remote endpoint vanished without a Bye.
            self.links.remove(&id);
            self.pending
                .push_back(HostEvent::Timeout { peer: Peer::new(id) });
        }
        true
    }
}

impl Host for MemoryHost {
    fn connect(&mut self, addr: &str, port: u16) -> Result<Peer, TransportError> {
        let listener = lock(&self.network.inner.listeners).get(&port).cloned();
        let Some(listener) = listener else {
            return Err(TransportError::ConnectFailed(format!(
                "no listener at {addr}:{port}"
            )));
        };
        listener
            .send(Packet::ConnectRequest {
                reply: self.inbox_tx.clone(),
                addr: self.local_addr.clone(),
            })
            .map_err(|_| TransportError::ConnectFailed(format!("listener at {addr}:{port} gone")))?;
        // Provisional handle; the Connect event carries the real one.
        Ok(Peer::new(0))
    }

    fn service(&mut self, timeout: Duration) -> Result<Option<HostEvent>, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.inbox_rx.recv_timeout(remaining) {
                Ok(packet) => self.handle_packet(packet),
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                // We hold our own sender, so this cannot fire in practice.
                Err(RecvTimeoutError::Disconnected) => return Err(TransportError::Shutdown),
            }
        }
    }

    fn send(
        &mut self,
        peer: Peer,
        data: &[u8],
        _reliability: Reliability,
    ) -> Result<(), TransportError> {
        if self.send_on_link(peer.id(), data) {
            Ok(())
        } else {
            Err(TransportError::PeerNotFound(peer.id()))
        }
    }

    fn broadcast_except(&mut self, except: Option<Peer>, data: &[u8], _reliability: Reliability) {
        let targets: Vec<u32> = self
            .links
            .keys()
            .copied()
            .filter(|id| except.map_or(true, |p| p.id() != *id))
            .collect();
        for id in targets {
            self.send_on_link(id, data);
        }
    }

    fn disconnect(&mut self, peer: Peer) {
        if let Some(link) = self.links.remove(&peer.id()) {
            let _ = link.tx.send(Packet::Bye { from: peer.id() });
            self.pending.push_back(HostEvent::Disconnect { peer });
        }
    }

    fn round_trip_time(&self, _peer: Peer) -> Duration {
        self.rtt
    }

    fn peer_addr(&self, peer: Peer) -> Option<String> {
        self.links.get(&peer.id()).map(|link| link.addr.clone())
    }

    fn flush(&mut self) {
        // Channel sends are synchronous; nothing is buffered locally.
    }
}

impl Drop for MemoryHost {
    fn drop(&mut self) {
        if let Some(port) = self.listen_port {
            lock(&self.network.inner.listeners).remove(&port);
        }
    }
}

/// Locks a mutex, riding through poisoning — hub state stays usable even
/// if another thread panicked while holding it.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(20);

    fn connected_pair() -> (MemoryHost, MemoryHost, Peer, Peer) {
        let network = MemoryNetwork::new();
        let mut server = network.listen(9000, 8).expect("listen");
        let mut client = network.open();
        client.connect("127.0.0.1", 9000).expect("connect");

        let Some(HostEvent::Connect { peer: client_peer }) =
            server.service(TICK).expect("server service")
        else {
            panic!("expected server-side connect");
        };
        let Some(HostEvent::Connect { peer: server_peer }) =
            client.service(TICK).expect("client service")
        else {
            panic!("expected client-side connect");
        };
        (server, client, client_peer, server_peer)
    }

    #[test]
    fn test_connect_produces_events_on_both_sides() {
        let (_server, _client, client_peer, server_peer) = connected_pair();
        // Both sides see the same assigned id.
        assert_eq!(client_peer.id(), server_peer.id());
    }

    #[test]
    fn test_connect_to_unknown_port_fails() {
        let network = MemoryNetwork::new();
        let mut client = network.open();
        assert!(matches!(
            client.connect("127.0.0.1", 12345),
            Err(TransportError::ConnectFailed(_))
        ));
    }

    #[test]
    fn test_data_flows_both_ways() {
        let (mut server, mut client, client_peer, server_peer) = connected_pair();

        client
            .send(server_peer, b"hello", Reliability::Reliable)
            .expect("send");
        match server.service(TICK).expect("service") {
            Some(HostEvent::Receive { peer, data }) => {
                assert_eq!(peer, client_peer);
                assert_eq!(data, b"hello");
            }
            other => panic!("unexpected event: {other:?}"),
        }

        server
            .send(client_peer, b"world", Reliability::UnreliableOrdered)
            .expect("send");
        match client.service(TICK).expect("service") {
            Some(HostEvent::Receive { data, .. }) => assert_eq!(data, b"world"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_disconnect_reaches_both_sides() {
        let (mut server, mut client, _client_peer, server_peer) = connected_pair();
        client.disconnect(server_peer);

        assert!(matches!(
            client.service(TICK).expect("service"),
            Some(HostEvent::Disconnect { .. })
        ));
        assert!(matches!(
            server.service(TICK).expect("service"),
            Some(HostEvent::Disconnect { .. })
        ));
    }

    #[test]
    fn test_send_to_disconnected_peer_is_peer_not_found() {
        let (mut server, mut client, client_peer, server_peer) = connected_pair();
        client.disconnect(server_peer);
        let _ = client.service(TICK);
        let _ = server.service(TICK);

        assert!(matches!(
            server.send(client_peer, b"late", Reliability::Reliable),
            Err(TransportError::PeerNotFound(_))
        ));
    }

    #[test]
    fn test_abrupt_drop_surfaces_as_timeout() {
        let (mut server, client, client_peer, _server_peer) = connected_pair();
        drop(client);

        // The dead link is discovered on the next send attempt.
        let _ = server.send(client_peer, b"ping", Reliability::Reliable);
        assert!(matches!(
            server.service(TICK).expect("service"),
            Some(HostEvent::Timeout { peer }) if peer == client_peer
        ));
    }

    #[test]
    fn test_listener_rejects_when_full() {
        let network = MemoryNetwork::new();
        let mut server = network.listen(9001, 1).expect("listen");

        let mut first = network.open();
        first.connect("127.0.0.1", 9001).expect("connect");
        let _ = server.service(TICK);

        let mut second = network.open();
        second.connect("127.0.0.1", 9001).expect("connect");
        let _ = server.service(TICK);

        assert!(matches!(
            second.service(TICK).expect("service"),
            Some(HostEvent::Disconnect { .. })
        ));
    }

    #[test]
    fn test_broadcast_except_skips_the_excluded_peer() {
        let network = MemoryNetwork::new();
        let mut server = network.listen(9002, 8).expect("listen");
        let mut a = network.open();
        let mut b = network.open();
        a.connect("127.0.0.1", 9002).expect("connect");
        let Some(HostEvent::Connect { peer: peer_a }) = server.service(TICK).expect("service")
        else {
            panic!("expected connect");
        };
        b.connect("127.0.0.1", 9002).expect("connect");
        let _ = server.service(TICK);
        let _ = a.service(TICK);
        let _ = b.service(TICK);

        server.broadcast_except(Some(peer_a), b"news", Reliability::Reliable);
        assert!(server.service(Duration::ZERO).expect("service").is_none());
        assert!(a.service(Duration::ZERO).expect("service").is_none());
        assert!(matches!(
            b.service(TICK).expect("service"),
            Some(HostEvent::Receive { data, .. }) if data == b"news"
        ));
    }

    #[test]
    fn test_peer_addr_known_while_connected() {
        let (server, _client, client_peer, _server_peer) = connected_pair();
        let addr = server.peer_addr(client_peer).expect("addr");
        assert!(addr.starts_with("mem://"));
    }

    #[test]
    fn test_dropping_listener_frees_the_port() {
        let network = MemoryNetwork::new();
        let server = network.listen(9003, 1).expect("listen");
        drop(server);
        assert!(network.listen(9003, 1).is_ok());
    }
}

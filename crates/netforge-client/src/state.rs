//! The client connection state machine.
//!
//! ```text
//!   Connecting ──(connect ok)──→ Connected ──(disconnect req)──→ Disconnecting
//!       │                           │   │                              │
//!       │(handshake fail)           │   └──(transport timeout)──→ TimedOut
//!       ▼                           ▼                                  │
//!   Disconnected ←──(transport disconnect)──────────────────────────────┘
//! ```
//!
//! `Disconnected` and `TimedOut` are terminal: no transition leaves
//! them, and a session that reached one stays inert forever.

use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use netforge_protocol::ClientId;

/// Lifecycle state of one client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Handshake in flight.
    Connecting = 0,
    /// Session established; frames flow.
    Connected = 1,
    /// Local disconnect requested; waiting for the transport to confirm.
    Disconnecting = 2,
    /// Terminal: cleanly closed or never established.
    Disconnected = 3,
    /// Terminal: the server went silent.
    TimedOut = 4,
}

impl ConnectionState {
    /// Whether this state can never be left.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Disconnected | Self::TimedOut)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Connected,
            2 => Self::Disconnecting,
            4 => Self::TimedOut,
            _ => Self::Disconnected,
        }
    }
}

const ID_UNASSIGNED: u32 = u32::MAX;

/// The few values the loop thread publishes for the consumer to read
/// directly instead of through events: lifecycle state, the cached
/// client id, and the last sampled round-trip time.
///
/// Strictly single-writer (the loop thread); the consumer only loads.
pub(crate) struct SharedState {
    state: AtomicU8,
    local_id: AtomicU32,
    rtt_micros: AtomicU64,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            local_id: AtomicU32::new(ID_UNASSIGNED),
            rtt_micros: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn client_id(&self) -> Option<ClientId> {
        match self.local_id.load(Ordering::Acquire) {
            ID_UNASSIGNED => None,
            id => Some(ClientId(id)),
        }
    }

    pub fn set_client_id(&self, id: ClientId) {
        self.local_id.store(id.0, Ordering::Release);
    }

    pub fn rtt(&self) -> Duration {
        Duration::from_micros(self.rtt_micros.load(Ordering::Relaxed))
    }

    pub fn set_rtt(&self, rtt: Duration) {
        self.rtt_micros.store(rtt.as_micros() as u64, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(ConnectionState::Disconnected.is_terminal());
        assert!(ConnectionState::TimedOut.is_terminal());
        assert!(!ConnectionState::Connecting.is_terminal());
        assert!(!ConnectionState::Connected.is_terminal());
        assert!(!ConnectionState::Disconnecting.is_terminal());
    }

    #[test]
    fn test_state_round_trips_through_shared_cell() {
        let shared = SharedState::new();
        assert_eq!(shared.state(), ConnectionState::Connecting);
        for state in [
            ConnectionState::Connected,
            ConnectionState::Disconnecting,
            ConnectionState::Disconnected,
            ConnectionState::TimedOut,
        ] {
            shared.set_state(state);
            assert_eq!(shared.state(), state);
        }
    }

    #[test]
    fn test_client_id_unassigned_until_set() {
        let shared = SharedState::new();
        assert_eq!(shared.client_id(), None);
        shared.set_client_id(ClientId(3));
        assert_eq!(shared.client_id(), Some(ClientId(3)));
    }

    #[test]
    fn test_rtt_round_trips() {
        let shared = SharedState::new();
        shared.set_rtt(Duration::from_millis(42));
        assert_eq!(shared.rtt(), Duration::from_millis(42));
    }
}

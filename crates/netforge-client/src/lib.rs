//! Client side of the Netforge messaging layer.
//!
//! A [`Client`] runs one logical session against a server:
//!
//! 1. **Session Loop** — a background thread that owns the transport
//!    host exclusively, performs the bounded handshake, services the
//!    engine every tick, and flushes queued outbound frames.
//! 2. **Event Bridge** — one single-producer/single-consumer queue per
//!    event category, moving decoded events from the loop thread to the
//!    application without either side ever blocking on the other.
//! 3. **State machine** — `Connecting → Connected → (Disconnecting →)
//!    Disconnected | TimedOut`; the two terminal states absorb.
//!
//! The application thread calls [`Client::poll`] with a
//! [`ClientHandler`] to drain the bridge; no callback is ever invoked
//! from the loop thread.

mod client;
mod config;
mod error;
mod events;
mod session;
mod state;

pub use client::Client;
pub use config::ClientConfig;
pub use error::ClientError;
pub use events::ClientHandler;
pub use state::ConnectionState;

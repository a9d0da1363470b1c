//! Server side of the Netforge messaging layer.
//!
//! A [`Server`] owns a listening transport host on a background Host
//! Loop thread. Each tick the loop drains transport events (registering
//! and deregistering peers, routing inbound frames), then flushes the
//! three outbound queues: broadcast-to-all, broadcast-excluding-one,
//! and explicit target lists.
//!
//! The application thread talks to the loop only through queues: sends
//! enqueue, [`Server::poll`] drains decoded events into a
//! [`ServerHandler`], and [`Server::stop`] is an advisory flag honored
//! within one tick.

mod config;
mod entities;
mod events;
mod host_loop;
mod peers;
mod queues;
mod router;
mod server;

pub use config::ServerConfig;
pub use events::ServerHandler;
pub use server::Server;

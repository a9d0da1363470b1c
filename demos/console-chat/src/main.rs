//! Console chat over the in-memory loopback transport: one server and
//! one client in a single process.
//!
//! Commands:
//!   create          ask the server to allocate an entity
//!   ping            print the last sampled round-trip time
//!   server <text>   send to server logic; it echoes "Client#N: text"
//!   stop            stop the server
//!   quit            disconnect the client and exit
//! Anything else is broadcast verbatim to every client, self included —
//! through the first owned entity once `create` has been used.

use std::io::BufRead;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, unbounded};
use tracing::info;

use netforge::prelude::*;

const PORT: u16 = 4000;
const MAX_CLIENTS: usize = 32;

/// Prints every client-side event as it drains, and keeps hold of the
/// first entity this client ends up owning.
#[derive(Default)]
struct Printer {
    my_id: Option<ClientId>,
    entity: Option<Entity>,
}

impl ClientHandler for Printer {
    fn on_connect(&mut self, client_id: ClientId) {
        self.my_id = Some(client_id);
        info!(%client_id, "connected");
    }
    fn on_connect_failed(&mut self) {
        info!("connection failed");
    }
    fn on_disconnect(&mut self) {
        info!("disconnected");
    }
    fn on_timeout(&mut self) {
        info!("timed out");
    }
    fn on_message(&mut self, payload: Vec<u8>) {
        println!("{}", String::from_utf8_lossy(&payload));
    }
    fn on_error(&mut self, error: ClientError) {
        info!(%error, "client error");
    }
    fn on_entity_created(&mut self, entity: Entity, _user_data: Vec<u8>) {
        println!("entity created: {entity}");
        if self.my_id == Some(entity.owner()) && self.entity.is_none() {
            self.entity = Some(entity);
        }
    }
    fn on_entity_message(&mut self, entity_id: EntityId, payload: Vec<u8>) {
        println!("{entity_id}: {}", String::from_utf8_lossy(&payload));
    }
}

/// Buffers application payloads; the main loop answers them, since the
/// handler itself has no access to the server handle.
#[derive(Default)]
struct Inbox {
    pending: Vec<(ClientId, Vec<u8>)>,
}

impl ServerHandler for Inbox {
    fn on_connect(&mut self, client: ClientId, addr: Option<String>) {
        info!(%client, addr = addr.as_deref().unwrap_or("?"), "peer joined");
    }
    fn on_receive(&mut self, from: ClientId, payload: Vec<u8>) {
        self.pending.push((from, payload));
    }
    fn on_disconnect(&mut self, client: ClientId) {
        info!(%client, "peer left");
    }
    fn on_timeout(&mut self, client: ClientId) {
        info!(%client, "peer timed out");
    }
}

/// Stdin is blocking, so a dedicated thread feeds lines into a channel
/// the main loop can try_recv.
fn stdin_lines() -> Receiver<String> {
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let network = MemoryNetwork::new();
    let listener = match network.listen(PORT, MAX_CLIENTS) {
        Ok(listener) => listener,
        Err(error) => {
            eprintln!("cannot listen on port {PORT}: {error}");
            return;
        }
    };
    let mut server = Server::start(listener, ServerConfig::default());
    let mut client = Client::connect(network.open(), "localhost", PORT, ClientConfig::default());
    let lines = stdin_lines();

    let mut printer = Printer::default();
    let mut inbox = Inbox::default();

    while client.is_running() || server.is_running() {
        client.poll(&mut printer);
        server.poll(&mut inbox);

        for (from, payload) in inbox.pending.drain(..) {
            let echo = format!("Client#{}: {}", from.0, String::from_utf8_lossy(&payload));
            server.broadcast(Frame::from_payload(Reliability::Reliable, echo.into_bytes()));
        }

        while let Ok(line) = lines.try_recv() {
            let line = line.trim();
            match line {
                "" => {}
                "create" => client.create_entity(b"demo"),
                "ping" => println!("ping: {:?}", client.ping()),
                "stop" => server.stop(),
                "quit" => client.disconnect(),
                _ => match line.strip_prefix("server ") {
                    Some(text) => {
                        client.send_server(Frame::from_payload(
                            Reliability::Reliable,
                            text.as_bytes(),
                        ));
                    }
                    // Chat through the entity once one exists.
                    None => {
                        let frame = Frame::from_payload(Reliability::Reliable, line.as_bytes());
                        match printer.entity {
                            Some(entity) => client.broadcast_entity(&entity, frame),
                            None => client.broadcast(frame),
                        }
                    }
                },
            }
        }

        thread::sleep(Duration::from_millis(10));
    }
}

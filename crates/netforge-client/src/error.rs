use netforge_protocol::{ClientId, EntityId, ProtocolError};

/// Errors surfaced through [`ClientHandler::on_error`].
///
/// None of these end the session. An ownership error never reaches the
/// wire at all; protocol and server errors are contained to the packet
/// that caused them.
///
/// [`ClientHandler::on_error`]: crate::ClientHandler::on_error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// A send addressed an entity this connection does not own.
    /// Checked locally against the last-known owner; nothing is queued.
    #[error("not the owner of {entity} (owner is {owner})")]
    Ownership { entity: EntityId, owner: ClientId },

    /// An inbound packet from the server failed to decode.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The server sent an `Error` frame.
    #[error("server error: {0}")]
    Server(String),
}

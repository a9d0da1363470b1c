//! Unified error type for the Netforge stack.

use netforge_client::ClientError;
use netforge_protocol::ProtocolError;
use netforge_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `netforge` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate. The
/// `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum NetforgeError {
    /// A transport-level error (connect, bind, send).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (unknown tag, truncated frame).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A client-session error (ownership, server-reported).
    #[error(transparent)]
    Client(#[from] ClientError),
}

//! Error types for the protocol layer.

/// A protocol violation found while decoding a packet.
///
/// Violations are fatal to the single packet, never to the loop that
/// decoded it: the server answers the offending peer with an `Error`
/// frame and the client reports through its error callback, and both
/// keep servicing the connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The tag byte selects no known format.
    ///
    /// Distinguished from truncation because it signals stream
    /// desynchronization rather than a short read.
    #[error("unknown frame tag {tag:#04x}")]
    UnknownTag { tag: u8 },

    /// The packet ended before a declared field was complete.
    #[error("frame truncated while reading {context}")]
    Truncated { context: &'static str },

    /// The embedded reliability byte is not one of the three classes.
    #[error("invalid reliability byte {0}")]
    InvalidReliability(u8),
}

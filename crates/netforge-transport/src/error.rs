/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// An outgoing connection could not even be initiated.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// A listening host could not be opened.
    #[error("bind failed: {0}")]
    BindFailed(String),

    /// A send referenced a peer that is no longer connected.
    ///
    /// Expected during disconnect races; callers drop the packet.
    #[error("peer {0} not found")]
    PeerNotFound(u32),

    /// The listener refused the connection (at capacity).
    #[error("server full")]
    ServerFull,

    /// The engine's internal channel is gone; the host is unusable.
    #[error("transport shut down")]
    Shutdown,
}

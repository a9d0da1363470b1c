use std::time::Duration;

/// Timing knobs for a client session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long the session loop waits for the transport-level connect
    /// to complete before reporting a connection failure.
    pub connect_timeout: Duration,

    /// Bounded wait used for each service call while connected. This is
    /// also the worst-case latency for honoring a disconnect request.
    pub tick: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            tick: Duration::from_millis(10),
        }
    }
}

use std::time::Duration;

/// Timing knobs for a server instance.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bounded wait used for each service call. This is also the
    /// worst-case latency for honoring a stop request.
    pub tick: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(5),
        }
    }
}

//! Proximity transport configuration

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for the proximity transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProximityConfig {
    /// Payloads kept per peer in the transport-level receive cache
    pub cache_capacity: usize,
    /// Payloads kept per peer in a connection's pre-ready cache
    pub conn_cache_capacity: usize,
    /// Depth of a connection's input pipe
    pub pipe_depth: usize,
    /// Buffered inbound connection requests. 1 keeps the handoff close to
    /// synchronous so backpressure reaches the driver callback; raise it if
    /// the overlay's accept loop is slow to turn around.
    pub inbound_queue_depth: usize,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 128,
            conn_cache_capacity: 128,
            pipe_depth: 32,
            inbound_queue_depth: 1,
        }
    }
}

impl ProximityConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transport-level cache capacity
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Set the per-connection pre-ready cache capacity
    pub fn with_conn_cache_capacity(mut self, capacity: usize) -> Self {
        self.conn_cache_capacity = capacity;
        self
    }

    /// Set the input pipe depth
    pub fn with_pipe_depth(mut self, depth: usize) -> Self {
        self.pipe_depth = depth;
        self
    }

    /// Set the inbound request queue depth
    pub fn with_inbound_queue_depth(mut self, depth: usize) -> Self {
        self.inbound_queue_depth = depth;
        self
    }
}

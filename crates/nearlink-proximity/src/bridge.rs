//! Native driver glue
//!
//! Native drivers call back from threads the transport does not own, with a
//! plain synchronous vocabulary. The bridge owns a runtime handle and turns
//! those callbacks into the transport's async entry points, blocking the
//! driver thread just long enough to preserve per-peer delivery order and
//! to propagate backpressure.

use std::sync::{Arc, Weak};

use nearlink_core::LogLevel;

use crate::transport::ProximityTransport;

// ----------------------------------------------------------------------------
// Driver Event Bridge
// ----------------------------------------------------------------------------

/// Callback surface handed to native driver bindings.
///
/// All methods must be invoked from threads outside the tokio runtime (the
/// driver's own threads); they block the calling thread until the transport
/// has taken the event.
pub struct DriverEventBridge {
    transport: Weak<ProximityTransport>,
    runtime: tokio::runtime::Handle,
}

impl DriverEventBridge {
    /// Build a bridge for `transport` on the current tokio runtime.
    ///
    /// Panics outside a runtime context; use [`DriverEventBridge::with_runtime`]
    /// when constructing from sync code.
    pub fn new(transport: &Arc<ProximityTransport>) -> Self {
        Self::with_runtime(transport, tokio::runtime::Handle::current())
    }

    /// Build a bridge driving `transport` through an explicit runtime handle
    pub fn with_runtime(
        transport: &Arc<ProximityTransport>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        Self {
            transport: Arc::downgrade(transport),
            runtime,
        }
    }

    /// The driver discovered a nearby peer
    pub fn found_peer(&self, remote_peer_id: &str) -> bool {
        match self.transport.upgrade() {
            Some(transport) => self
                .runtime
                .block_on(transport.handle_found_peer(remote_peer_id)),
            None => false,
        }
    }

    /// The driver lost its link to a peer
    pub fn lost_peer(&self, remote_peer_id: &str) {
        if let Some(transport) = self.transport.upgrade() {
            transport.handle_lost_peer(remote_peer_id);
        }
    }

    /// The driver delivered a payload from a peer
    pub fn receive_from_peer(&self, remote_peer_id: &str, payload: &[u8]) {
        if let Some(transport) = self.transport.upgrade() {
            self.runtime
                .block_on(transport.receive_from_peer(remote_peer_id, payload));
        }
    }

    /// The driver emitted a log line; out-of-range levels fall back to debug
    pub fn log(&self, raw_level: i32, message: &str) {
        if let Some(transport) = self.transport.upgrade() {
            let level = LogLevel::from_raw(raw_level).unwrap_or(LogLevel::Debug);
            transport.log(level, message);
        }
    }
}

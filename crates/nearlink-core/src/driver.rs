//! Native driver capability
//!
//! The native driver is the platform side of a proximity link (Bluetooth LE,
//! Apple Multipeer Connectivity, Google Nearby). It discovers nearby devices
//! autonomously and ferries opaque payloads; the transport consumes it
//! through [`ProximityDriver`] and receives its events through the transport
//! callback surface.

// ----------------------------------------------------------------------------
// Log Levels
// ----------------------------------------------------------------------------

/// Log severities used by native drivers (integers 0-4 on the wire).
///
/// `Verbose` and `Debug` map to the same sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Verbose = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogLevel {
    /// Convert the raw integer a driver binding hands over
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Verbose),
            1 => Some(Self::Debug),
            2 => Some(Self::Info),
            3 => Some(Self::Warn),
            4 => Some(Self::Error),
            _ => None,
        }
    }
}

// ----------------------------------------------------------------------------
// Driver Capability
// ----------------------------------------------------------------------------

/// Capability exposed by a native proximity driver.
///
/// Peer ids cross this interface in their canonical string encoding (see
/// [`crate::types::PeerId`]). All methods are callable from any thread; the
/// transport never holds internal locks across a call into the driver.
pub trait ProximityDriver: Send + Sync {
    /// Machine name of the proximity protocol, e.g. `ble`, `mc`, `nearby`
    fn protocol_name(&self) -> &str;

    /// Numeric code registered for the protocol in the address grammar
    fn protocol_code(&self) -> i32;

    /// Sentinel multiaddr meaning "bind locally"
    fn default_addr(&self) -> &str;

    /// Bring the driver up. Called when the transport's listener is
    /// installed; discovery and advertising start here.
    fn start(&self, local_peer_id: &str);

    /// Tear the driver down. Called when the listener closes.
    fn stop(&self);

    /// Whether the driver currently holds a native link to the peer.
    /// Proximity links only form through discovery, so this is the only
    /// sense in which a peer can be "dialed".
    fn dial_peer(&self, remote_peer_id: &str) -> bool;

    /// Ship a payload over the native link. Returns false if the peer is
    /// not linked or the link rejected the payload.
    fn send_to_peer(&self, remote_peer_id: &str, payload: &[u8]) -> bool;

    /// Ask the driver to drop its native link to the peer
    fn close_conn_with_peer(&self, remote_peer_id: &str);
}

// ----------------------------------------------------------------------------
// Noop Driver
// ----------------------------------------------------------------------------

/// Driver that is never linked to anyone.
///
/// Safe fallback when no platform driver is available; also convenient in
/// tests that only exercise the overlay-facing surface.
#[derive(Debug, Default)]
pub struct NoopDriver;

impl ProximityDriver for NoopDriver {
    fn protocol_name(&self) -> &str {
        "noop"
    }

    fn protocol_code(&self) -> i32 {
        0
    }

    fn default_addr(&self) -> &str {
        "/noop/local"
    }

    fn start(&self, local_peer_id: &str) {
        tracing::debug!(%local_peer_id, "noop proximity driver started");
    }

    fn stop(&self) {}

    fn dial_peer(&self, _remote_peer_id: &str) -> bool {
        false
    }

    fn send_to_peer(&self, _remote_peer_id: &str, _payload: &[u8]) -> bool {
        false
    }

    fn close_conn_with_peer(&self, _remote_peer_id: &str) {}
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

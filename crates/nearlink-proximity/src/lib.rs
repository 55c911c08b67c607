//! Proximity transport for the nearlink overlay
//!
//! This crate plugs a platform short-range link (Bluetooth LE, Apple
//! Multipeer Connectivity, Google Nearby) into the overlay as a first-class
//! dial/listen transport. The platform side is a callback-driven native
//! driver that autonomously discovers nearby devices and ferries opaque
//! payloads; this crate reconciles that push model with the overlay's pull
//! model.
//!
//! ## Architecture
//!
//! - [`config`] - transport tuning knobs
//! - [`ring_buffer`] - bounded per-peer receive cache
//! - [`conn`] - logical connection with pre-ready buffering
//! - [`listener`] - rendezvous between discovery events and the accept loop
//! - [`registry`] - process-wide one-listener-per-protocol enforcement
//! - [`transport`] - dial/listen surface and driver callback dispatch
//! - [`bridge`] - sync glue for native driver threads
//!
//! ## How a connection forms
//!
//! When the driver reports a found peer, both sides run the same
//! deterministic election: the peer with the lexicographically smaller id
//! dials, the other accepts. The dial happens on a detached task so the
//! driver callback returns immediately; the accept side hands a connection
//! request to the listener, where the overlay's accept loop picks it up.
//! Payloads that arrive before the connection is upgraded are buffered in
//! bounded caches and replayed in order.

mod bridge;
mod config;
mod conn;
mod listener;
mod registry;
mod ring_buffer;
mod transport;

// Public API exports
pub use bridge::DriverEventBridge;
pub use config::ProximityConfig;
pub use conn::Conn;
pub use listener::Listener;
pub use registry::{global as transport_registry, TransportRegistry};
pub use ring_buffer::RingBufferMap;
pub use transport::ProximityTransport;

// Re-export the shared vocabulary for convenience
pub use nearlink_core::{
    AddrTtl, CapableConn, Connectedness, DialOptions, Direction, LogLevel, NoopDriver,
    OverlayConn, PeerId, Peerstore, ProximityAddr, ProximityDriver, Result, Swarm,
    TransportError, Upgrader,
};

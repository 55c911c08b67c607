//! Core types and capability traits for the nearlink proximity transport
//!
//! This crate defines the vocabulary shared between the proximity transport
//! machinery and its collaborators:
//!
//! - [`types`] - peer identity and small shared enums
//! - [`addr`] - the two-component proximity multiaddress
//! - [`error`] - the transport error taxonomy
//! - [`driver`] - the native driver capability consumed by the transport
//! - [`overlay`] - the overlay capabilities (swarm, peerstore, upgrader)
//!
//! The transport implementation itself lives in `nearlink-proximity`.

pub mod addr;
pub mod driver;
pub mod error;
pub mod overlay;
pub mod types;

pub use addr::ProximityAddr;
pub use driver::{LogLevel, NoopDriver, ProximityDriver};
pub use error::{Result, TransportError};
pub use overlay::{
    CapableConn, DialOptions, OverlayConn, Peerstore, Swarm, Upgrader,
};
pub use types::{AddrTtl, Connectedness, Direction, PeerId};

//! Overlay capability traits
//!
//! The transport consumes the overlay's swarm, peerstore and upgrader
//! through these narrow traits, keeping the dependency surface to exactly
//! what the proximity machinery needs.

use std::sync::Arc;

use async_trait::async_trait;

use crate::addr::ProximityAddr;
use crate::error::Result;
use crate::types::{AddrTtl, Connectedness, Direction, PeerId};

// ----------------------------------------------------------------------------
// Peerstore
// ----------------------------------------------------------------------------

/// The overlay's address book
pub trait Peerstore: Send + Sync {
    /// Record an address for a peer
    fn add_addr(&self, peer: PeerId, addr: &ProximityAddr, ttl: AddrTtl);

    /// Record several addresses for a peer
    fn add_addrs(&self, peer: PeerId, addrs: &[ProximityAddr], ttl: AddrTtl) {
        for addr in addrs {
            self.add_addr(peer, addr, ttl);
        }
    }

    /// Overwrite the lifetime of a recorded address; [`AddrTtl::Forget`]
    /// drops it immediately
    fn set_addr(&self, peer: PeerId, addr: &ProximityAddr, ttl: AddrTtl);
}

// ----------------------------------------------------------------------------
// Swarm
// ----------------------------------------------------------------------------

/// One established overlay-level connection to a peer
pub trait OverlayConn: Send + Sync {
    fn remote_multiaddr(&self) -> ProximityAddr;
    fn close(&self);
}

/// The overlay's connection manager
#[async_trait]
pub trait Swarm: Send + Sync {
    /// Identity of the local peer
    fn local_peer(&self) -> PeerId;

    /// The overlay's address book
    fn peerstore(&self) -> Arc<dyn Peerstore>;

    /// Current reachability of a peer
    fn connectedness(&self, peer: PeerId) -> Connectedness;

    /// Open (or join) an overlay connection to a peer using whatever
    /// addresses the peerstore holds
    async fn dial_peer(&self, peer: PeerId) -> Result<()>;

    /// All live overlay connections to a peer
    fn conns_to_peer(&self, peer: PeerId) -> Vec<Arc<dyn OverlayConn>>;
}

// ----------------------------------------------------------------------------
// Upgrader
// ----------------------------------------------------------------------------

/// Connection handed back by the upgrader: authenticated, muxed and usable
/// by the overlay
pub trait CapableConn: Send + Sync + std::fmt::Debug {
    fn remote_peer(&self) -> PeerId;
    fn remote_multiaddr(&self) -> ProximityAddr;
    fn direction(&self) -> Direction;
    fn close(&self);
}

/// Wraps a raw transport connection into a [`CapableConn`].
///
/// `C` is the transport's raw connection type. Upgraders that exchange
/// handshake traffic over the raw connection must mark it ready themselves
/// before reading; the transport marks it ready (idempotently) once
/// `upgrade` returns.
#[async_trait]
pub trait Upgrader<C>: Send + Sync
where
    C: Send + 'static,
{
    async fn upgrade(&self, conn: C, direction: Direction) -> Result<Arc<dyn CapableConn>>;
}

// ----------------------------------------------------------------------------
// Dial Options
// ----------------------------------------------------------------------------

/// Options for post-discovery dials
#[derive(Debug, Clone, Copy, Default)]
pub struct DialOptions {
    /// Dial even if the overlay already considers the peer connected
    pub force_direct: bool,
    /// Treat a limited connection as good enough
    pub allow_limited: bool,
}

//! Core types for the nearlink proximity transport
//!
//! Newtype patterns for the identifiers shared between the transport and the
//! overlay capability traits.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

// ----------------------------------------------------------------------------
// Peer Identifier
// ----------------------------------------------------------------------------

/// Unique identifier for a peer (8 bytes, truncated from a full public key).
///
/// The canonical string encoding is lowercase hex; it is what crosses the
/// native driver boundary and what the dialer election compares, so hex
/// ordering and byte ordering agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerId([u8; 8]);

impl PeerId {
    /// Create a new PeerId from 8 bytes
    pub fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Create a PeerId from the first 8 bytes of a longer identifier
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut id = [0u8; 8];
        let len = core::cmp::min(bytes.len(), 8);
        id[..len].copy_from_slice(&bytes[..len]);
        Self(id)
    }

    /// Parse the canonical lowercase-hex encoding (16 hex chars)
    pub fn decode(s: &str) -> Result<Self, TransportError> {
        let bytes = hex::decode(s).map_err(|_| TransportError::InvalidPeerId {
            input: s.to_string(),
        })?;
        if bytes.len() != 8 {
            return Err(TransportError::InvalidPeerId {
                input: s.to_string(),
            });
        }
        let mut id = [0u8; 8];
        id.copy_from_slice(&bytes);
        Ok(Self(id))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

// ----------------------------------------------------------------------------
// Connection Direction
// ----------------------------------------------------------------------------

/// Direction of a logical connection relative to the local peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Inbound,
    Outbound,
}

// ----------------------------------------------------------------------------
// Connectedness
// ----------------------------------------------------------------------------

/// The overlay's view of how reachable a peer currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectedness {
    NotConnected,
    Connected,
    /// Reachable only through a relayed or otherwise restricted path
    Limited,
}

// ----------------------------------------------------------------------------
// Address TTL
// ----------------------------------------------------------------------------

/// Lifetime of an address recorded in the overlay peerstore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrTtl {
    /// Short-lived entry for a freshly discovered address
    Temporary,
    /// Drop the address immediately
    Forget,
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

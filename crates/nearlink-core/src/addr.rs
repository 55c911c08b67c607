//! Proximity multiaddress handling
//!
//! A proximity address is the two-component path `/<protocol-name>/<peer-id>`.
//! Nothing beyond this grammar is understood here; general multiaddress
//! parsing belongs to the overlay.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::types::PeerId;

// ----------------------------------------------------------------------------
// Proximity Address
// ----------------------------------------------------------------------------

/// Address of a peer reachable over a proximity protocol
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProximityAddr {
    protocol: String,
    value: String,
}

impl ProximityAddr {
    /// Build an address from raw components
    pub fn new(protocol: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            value: value.into(),
        }
    }

    /// Build the canonical address of `peer` under `protocol`
    pub fn from_peer(protocol: impl Into<String>, peer: PeerId) -> Self {
        Self::new(protocol, peer.to_string())
    }

    /// Parse a `/<protocol>/<value>` path
    pub fn parse(s: &str) -> Result<Self, TransportError> {
        let invalid = |reason: &str| TransportError::InvalidMultiaddr {
            addr: s.to_string(),
            reason: reason.to_string(),
        };

        let rest = s.strip_prefix('/').ok_or_else(|| invalid("missing leading slash"))?;
        let (protocol, value) = rest
            .split_once('/')
            .ok_or_else(|| invalid("expected two components"))?;
        if protocol.is_empty() || value.is_empty() {
            return Err(invalid("empty component"));
        }
        if value.contains('/') {
            return Err(invalid("expected exactly two components"));
        }
        Ok(Self::new(protocol, value))
    }

    /// The protocol-name component
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// The opaque payload component (a peer id for well-formed addresses)
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Decode the payload component as a peer id
    pub fn peer_id(&self) -> Result<PeerId, TransportError> {
        PeerId::decode(&self.value)
    }
}

impl fmt::Display for ProximityAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.protocol, self.value)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        let addr = ProximityAddr::parse("/ble/abcdef123456789a").unwrap();
        assert_eq!(addr.protocol(), "ble");
        assert_eq!(addr.value(), "abcdef123456789a");
        assert_eq!(addr.to_string(), "/ble/abcdef123456789a");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(ProximityAddr::parse("ble/abc").is_err());
        assert!(ProximityAddr::parse("/ble").is_err());
        assert!(ProximityAddr::parse("/ble/").is_err());
        assert!(ProximityAddr::parse("//abc").is_err());
        assert!(ProximityAddr::parse("/ble/abc/extra").is_err());
    }

    #[test]
    fn test_from_peer_is_canonical() {
        let peer = PeerId::new([1, 2, 3, 4, 5, 6, 7, 8]);
        let addr = ProximityAddr::from_peer("mc", peer);
        assert_eq!(addr.to_string(), "/mc/0102030405060708");
        assert_eq!(addr.peer_id().unwrap(), peer);
    }

    #[test]
    fn test_peer_id_rejects_foreign_payload() {
        let addr = ProximityAddr::new("ble", "not-a-peer-id");
        assert!(addr.peer_id().is_err());
    }
}

//! Error types for the nearlink proximity transport

use thiserror::Error;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors surfaced by the proximity transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid multiaddr {addr}: {reason}")]
    InvalidMultiaddr { addr: String, reason: String },

    #[error("malformed peer id: {input}")]
    InvalidPeerId { input: String },

    #[error("no active listener")]
    NoListener,

    #[error("peer {peer_id} is not linked by the native driver")]
    PeerNotLinked { peer_id: String },

    #[error("already connected to {peer_id}")]
    AlreadyConnected { peer_id: String },

    #[error("one listener maximum for protocol {protocol}")]
    ListenerExists { protocol: String },

    #[error("listener closed")]
    ListenerClosed,

    #[error("dial to {peer_id} failed: {reason}")]
    DialFailed { peer_id: String, reason: String },

    #[error("send to {peer_id} failed over the native link")]
    SendFailed { peer_id: String },

    #[error("connection closed")]
    ConnectionClosed,

    #[error("upgrade failed: {reason}")]
    UpgradeFailed { reason: String },
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, TransportError>;

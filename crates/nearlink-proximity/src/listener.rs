//! Inbound connection rendezvous
//!
//! The listener runs no I/O loop of its own. Discovery events that elect the
//! local peer as acceptor are injected by the transport and handed to the
//! overlay's accept loop through a bounded channel; the listener is purely
//! the meeting point between the two.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use nearlink_core::{CapableConn, Direction, PeerId, ProximityAddr, Result, TransportError};

use crate::registry;
use crate::transport::ProximityTransport;

// ----------------------------------------------------------------------------
// Inbound Requests
// ----------------------------------------------------------------------------

/// A discovered peer that elected us acceptor
pub(crate) struct ConnReq {
    pub remote_addr: ProximityAddr,
    pub remote_peer: PeerId,
}

// ----------------------------------------------------------------------------
// Listener
// ----------------------------------------------------------------------------

/// Accepts inbound proximity connections surfaced by discovery events
#[derive(Debug)]
pub struct Listener {
    local_addr: ProximityAddr,
    req_tx: mpsc::Sender<ConnReq>,
    req_rx: Mutex<mpsc::Receiver<ConnReq>>,
    closed: AtomicBool,
    cancel: CancellationToken,
    transport: Weak<ProximityTransport>,
}

impl Listener {
    pub(crate) fn new(transport: &ProximityTransport, local_addr: ProximityAddr) -> Arc<Self> {
        let (req_tx, req_rx) = mpsc::channel(transport.config().inbound_queue_depth);
        Arc::new(Self {
            local_addr,
            req_tx,
            req_rx: Mutex::new(req_rx),
            closed: AtomicBool::new(false),
            cancel: transport.cancel_token().child_token(),
            transport: transport.weak_self().clone(),
        })
    }

    /// Address the listener is bound to, normalized to the local peer id
    pub fn local_addr(&self) -> &ProximityAddr {
        &self.local_addr
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Hand an inbound connection request to the accept loop.
    ///
    /// The handoff applies backpressure: it completes only once the request
    /// fits in the bounded queue. Returns false if the listener shut down
    /// first.
    pub(crate) async fn enqueue(&self, req: ConnReq) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            res = self.req_tx.send(req) => res.is_ok(),
        }
    }

    /// Block until a discovered peer elects us acceptor, then upgrade the
    /// inbound connection.
    ///
    /// Returns [`TransportError::ListenerClosed`] once the listener is
    /// closed.
    pub async fn accept(&self) -> Result<Arc<dyn CapableConn>> {
        let req = {
            let mut req_rx = self.req_rx.lock().await;
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(TransportError::ListenerClosed),
                req = req_rx.recv() => req.ok_or(TransportError::ListenerClosed)?,
            }
        };
        debug!(remote = %req.remote_peer, "accepting inbound proximity conn");

        let transport = self
            .transport
            .upgrade()
            .ok_or(TransportError::ListenerClosed)?;
        transport
            .upgrade_new_conn(req.remote_addr, req.remote_peer, Direction::Inbound)
            .await
    }

    /// Stop accepting, tear the native driver down and release the
    /// transport's listener slot. Pending requests are not drained.
    /// Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.cancel.cancel();
        if let Some(transport) = self.transport.upgrade() {
            // The driver lives for exactly as long as the listener.
            transport.driver().stop();
            registry::global().deregister(transport.driver().protocol_name());
            transport.clear_listener();
        }
        info!(addr = %self.local_addr, "proximity listener closed");
    }
}

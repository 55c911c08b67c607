//! Logical connection to a remote peer
//!
//! A [`Conn`] exists from the moment a discovered peer is dialed (or dials
//! us) until either side closes it. Payloads the driver delivers before the
//! overlay finishes upgrading the connection are parked in a per-connection
//! cache and replayed, in order, once the connection becomes ready.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use nearlink_core::{Direction, PeerId, ProximityAddr, Result, TransportError};

use crate::ring_buffer::RingBufferMap;
use crate::transport::ProximityTransport;

// ----------------------------------------------------------------------------
// Connection
// ----------------------------------------------------------------------------

/// Raw proximity connection handed to the overlay's upgrader.
///
/// State is monotonic: opening, then ready, then closed. Once ready,
/// payloads bypass the pre-ready cache for good.
#[derive(Debug)]
pub struct Conn {
    remote_peer: PeerId,
    remote_addr: ProximityAddr,
    local_addr: ProximityAddr,
    direction: Direction,
    /// Lock-free readiness fast path; transitions happen under `ready_lock`.
    ready: AtomicBool,
    /// Guards the readiness transition and pre-ready cache admission.
    ready_lock: Mutex<()>,
    cache: RingBufferMap,
    pipe_tx: mpsc::Sender<Vec<u8>>,
    pipe_rx: Mutex<mpsc::Receiver<Vec<u8>>>,
    closed: AtomicBool,
    cancel: CancellationToken,
    transport: Weak<ProximityTransport>,
}

impl Conn {
    /// Create a connection to `remote_peer` and insert it into the
    /// transport's connection map.
    ///
    /// Fails if a connection to that peer already exists. Payloads parked in
    /// the transport-level cache migrate into the new connection's pre-ready
    /// cache so nothing is reordered across the boundary.
    pub(crate) fn new(
        transport: &ProximityTransport,
        remote_addr: ProximityAddr,
        remote_peer: PeerId,
        direction: Direction,
    ) -> Result<Arc<Self>> {
        let config = transport.config();
        let local_addr = transport.listener_addr().ok_or(TransportError::NoListener)?;
        let (pipe_tx, pipe_rx) = mpsc::channel(config.pipe_depth);
        let key = remote_peer.to_string();

        let conn = Arc::new(Self {
            remote_peer,
            remote_addr,
            local_addr,
            direction,
            ready: AtomicBool::new(false),
            ready_lock: Mutex::new(()),
            cache: RingBufferMap::new(config.conn_cache_capacity),
            pipe_tx,
            pipe_rx: Mutex::new(pipe_rx),
            closed: AtomicBool::new(false),
            cancel: transport.cancel_token().child_token(),
            transport: transport.weak_self().clone(),
        });

        // Insertion and migration happen under the map's write lock so a
        // concurrent receive callback cannot slip a payload in between.
        let mut conn_map = transport.conn_map().write();
        if conn_map.contains_key(&key) {
            return Err(TransportError::AlreadyConnected { peer_id: key });
        }
        for payload in transport.cache().drain(&key) {
            conn.cache.add(&key, &payload);
        }
        conn_map.insert(key, conn.clone());
        drop(conn_map);

        debug!(remote = %conn.remote_peer, ?direction, "new proximity conn");
        Ok(conn)
    }

    /// Remote peer identity
    pub fn remote_peer(&self) -> PeerId {
        self.remote_peer
    }

    /// Address of the remote peer
    pub fn remote_multiaddr(&self) -> &ProximityAddr {
        &self.remote_addr
    }

    /// Address this side is listening on
    pub fn local_multiaddr(&self) -> &ProximityAddr {
        &self.local_addr
    }

    /// Whether this side dialed or accepted
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether the connection has been marked ready
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Mark the connection ready, first replaying the pre-ready cache into
    /// the input pipe in FIFO order. Idempotent.
    pub async fn set_ready(&self) {
        let _guard = self.ready_lock.lock().await;
        if self.ready.load(Ordering::Acquire) {
            return;
        }
        for payload in self.cache.drain(&self.remote_peer.to_string()) {
            self.push(payload).await;
        }
        self.ready.store(true, Ordering::Release);
    }

    /// Route a payload received from the native driver.
    ///
    /// Payloads arriving before readiness are parked in the pre-ready
    /// cache; later ones go straight to the input pipe. Payloads delivered
    /// to a closing connection are dropped silently.
    pub(crate) async fn deliver(&self, payload: Vec<u8>) {
        if !self.ready.load(Ordering::Acquire) {
            let _guard = self.ready_lock.lock().await;
            if !self.ready.load(Ordering::Acquire) {
                debug!(remote = %self.remote_peer, "conn not ready, caching payload");
                self.cache.add(&self.remote_peer.to_string(), &payload);
                return;
            }
        }
        self.push(payload).await;
    }

    async fn push(&self, payload: Vec<u8>) {
        tokio::select! {
            res = self.pipe_tx.send(payload) => {
                let _ = res;
            }
            _ = self.cancel.cancelled() => {}
        }
    }

    /// Await the next payload from the remote peer
    pub async fn read(&self) -> Result<Vec<u8>> {
        let mut pipe = self.pipe_rx.lock().await;
        tokio::select! {
            payload = pipe.recv() => payload.ok_or(TransportError::ConnectionClosed),
            _ = self.cancel.cancelled() => Err(TransportError::ConnectionClosed),
        }
    }

    /// Ship a payload to the remote peer over the native link
    pub fn write(&self, payload: &[u8]) -> Result<usize> {
        if self.cancel.is_cancelled() {
            return Err(TransportError::ConnectionClosed);
        }
        let transport = self
            .transport
            .upgrade()
            .ok_or(TransportError::ConnectionClosed)?;
        let key = self.remote_peer.to_string();
        if !transport.driver().send_to_peer(&key, payload) {
            return Err(TransportError::SendFailed { peer_id: key });
        }
        Ok(payload.len())
    }

    /// Close the connection: remove it from the transport's connection map
    /// and cancel the input pipe. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.cancel.cancel();
        if let Some(transport) = self.transport.upgrade() {
            transport.remove_conn(&self.remote_peer.to_string());
        }
        debug!(remote = %self.remote_peer, "proximity conn closed");
    }
}
